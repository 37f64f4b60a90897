// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of resource record-related data structures.
//!
//! [RFC 2181 § 5] defines an RRset as a group of records with the same
//! owner, class, and type, and stipulates that all records in an RRset
//! share a TTL. DNS lookups, DNSSEC, and response construction all work
//! in terms of RRsets, so this crate stores and passes around records
//! grouped that way: the [`Rrset`] structure carries the owner, type,
//! class, and TTL once, plus the [`Rdata`] of each record in a packed
//! [`RdataSetOwned`].
//!
//! RRsets returned from zone lookups are shared by reference (see
//! [`SharedRrset`]) and are immutable once a zone is built.
//!
//! [RFC 2181 § 5]: https://datatracker.ietf.org/doc/html/rfc2181#section-5

mod rdata;
mod rdata_set;
mod rr_type;
mod rrset;
mod ttl;

pub use rdata::{Nsec3Param, Nsec3Rdata, Rdata, RdataTooLongError};
pub use rdata_set::{RdataSet, RdataSetOwned};
pub use rr_type::Type;
pub use rrset::{Rrset, SharedRrset};
pub use ttl::Ttl;

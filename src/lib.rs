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

//! The query-resolution core of an authoritative DNS server.
//!
//! Warden implements the part of an authoritative nameserver that is
//! actually prescribed by the RFCs: given a parsed question
//! `(QNAME, QTYPE, QCLASS)` and a set of locally hosted zones, it
//! produces the answer, authority, and additional sections of the
//! response, the response code, and—when the zone is signed—the NSEC or
//! NSEC3 denial-of-existence proofs required by [RFC 4035] and
//! [RFC 5155].
//!
//! The crate is a library with no I/O of its own. Message parsing and
//! serialization, transports, zone loading, and configuration are left
//! to the embedding server; they interact with the core through three
//! seams:
//!
//! * the [`ZoneFinder`](zone::ZoneFinder) trait, the per-zone lookup
//!   primitive (a ready-made in-memory implementation is provided by
//!   [`TreeZone`](zone::TreeZone));
//! * the [`ZoneTable`](zone::ZoneTable), which selects the zone that
//!   should answer a given query name; and
//! * the [`ResponseBuilder`](response::ResponseBuilder) trait, the sink
//!   into which the resolver writes the sections of the response.
//!
//! The [`resolver`] module ties these together: its
//! [`process`](resolver::process) function is the entry point for
//! answering one query.
//!
//! [RFC 4035]: https://datatracker.ietf.org/doc/html/rfc4035
//! [RFC 5155]: https://datatracker.ietf.org/doc/html/rfc5155

pub mod class;
pub mod name;
pub mod rcode;
pub mod resolver;
pub mod response;
pub mod rr;
pub mod zone;

mod util;

pub use class::Class;
pub use rcode::Rcode;

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

//! The [`Rrset`] structure and the [`SharedRrset`] alias.

use std::fmt;
use std::sync::Arc;

use super::{Rdata, RdataSetOwned, Ttl, Type};
use crate::class::Class;
use crate::name::Name;

/// A set of resource records sharing an owner, class, type, and TTL
/// ([RFC 2181 § 5]).
///
/// An `Rrset` is constructed empty with [`Rrset::new`] and filled with
/// [`Rrset::push_rdata`], which silently drops RDATA already present in
/// the set (following the behavior of other nameservers).
///
/// Once a zone is built, its RRsets are conceptually immutable and are
/// handed out as [`SharedRrset`]s. The resolver may also synthesize
/// fresh RRsets of its own (wildcard expansions and DNAME-derived
/// CNAMEs); these go through the same type.
///
/// [RFC 2181 § 5]: https://datatracker.ietf.org/doc/html/rfc2181#section-5
#[derive(Clone)]
pub struct Rrset {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub rdatas: RdataSetOwned,
}

/// An [`Rrset`] shared by reference.
///
/// RRsets returned from zone lookups live at least as long as the
/// response building for the query; reference counting gives that
/// lifetime without tying response construction to the zone's borrow.
pub type SharedRrset = Arc<Rrset>;

impl Rrset {
    /// Creates a new `Rrset` with the given owner, type, class, and
    /// TTL. It initially contains no record data.
    pub fn new(owner: Name, rr_type: Type, class: Class, ttl: Ttl) -> Self {
        Self {
            owner,
            rr_type,
            class,
            ttl,
            rdatas: RdataSetOwned::new(),
        }
    }

    /// Adds an [`Rdata`] to this `Rrset`. Duplicate RDATA (compared
    /// with the type-aware rules of [`Rdata::equals`]) is silently
    /// discarded.
    pub fn push_rdata(&mut self, rdata: &Rdata) {
        self.rdatas.insert(self.rr_type, rdata);
    }

    /// Returns a copy of this `Rrset` under a different owner name.
    /// This is how wildcard-sourced answers are rewritten to the query
    /// name.
    pub fn with_owner(&self, owner: Name) -> Self {
        Self {
            owner,
            rr_type: self.rr_type,
            class: self.class,
            ttl: self.ttl,
            rdatas: self.rdatas.clone(),
        }
    }
}

impl fmt::Debug for Rrset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rrset")
            .field("owner", &self.owner)
            .field("rr_type", &self.rr_type)
            .field("class", &self.class)
            .field("ttl", &self.ttl)
            .field("rdatas", &self.rdatas)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

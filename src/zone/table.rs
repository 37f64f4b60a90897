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

//! The [`ZoneTable`] structure.

use std::collections::HashMap;
use std::sync::Arc;

use super::ZoneFinder;
use crate::class::Class;
use crate::name::Name;

/// The set of zones a server is authoritative for, keyed by apex name.
///
/// A `ZoneTable` implements step 2 of the [RFC 1034 § 4.3.2] lookup
/// algorithm: finding the zone that is the nearest ancestor to a query
/// name. [`ZoneTable::find`] probes the table with each suffix of the
/// query name, longest first, and reports whether the hit (if any) was
/// exact or a proper suffix.
///
/// A table holds zones of a single DNS class. Zones are shared through
/// [`Arc`], so replacing a zone is atomic from the point of view of
/// in-flight queries: a query that has already obtained its finder
/// keeps reading the old zone, while new queries see the replacement.
///
/// [RFC 1034 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-4.3.2
pub struct ZoneTable<F> {
    class: Class,
    zones: HashMap<Name, Arc<F>>,
}

/// The outcome classification of a [`ZoneTable::find`] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZoneMatch {
    /// The queried name is exactly the apex of a held zone.
    Success,

    /// The queried name falls under the apex of a held zone.
    PartialMatch,

    /// No held zone contains the queried name.
    NotFound,
}

/// The result of a [`ZoneTable::find`] call.
pub struct ZoneTableAnswer<'a, F> {
    /// The outcome classification.
    pub code: ZoneMatch,

    /// The finder for the matched zone, when there is one.
    pub finder: Option<&'a Arc<F>>,
}

impl<F> ZoneTable<F>
where
    F: ZoneFinder,
{
    /// Creates a new, initially empty `ZoneTable` holding zones of the
    /// given class.
    pub fn new(class: Class) -> Self {
        Self {
            class,
            zones: HashMap::new(),
        }
    }

    /// Returns the DNS class of the zones in this table.
    pub fn class(&self) -> Class {
        self.class
    }

    /// Adds a zone to the table, keyed by its origin. Any zone
    /// previously held at the same apex is replaced and returned; this
    /// is how a loader publishes a fresh snapshot of a zone.
    pub fn insert(&mut self, finder: Arc<F>) -> Option<Arc<F>> {
        self.zones.insert(finder.origin().clone(), finder)
    }

    /// Removes and returns the zone whose apex is `apex`, if the table
    /// holds one.
    pub fn remove(&mut self, apex: &Name) -> Option<Arc<F>> {
        self.zones.remove(apex)
    }

    /// Finds the zone that is the nearest ancestor to `name`.
    ///
    /// The table is probed with each suffix of `name` in turn, starting
    /// with `name` itself. The first hit determines the result: a hit
    /// on `name` itself is [`ZoneMatch::Success`], a hit on a proper
    /// suffix is [`ZoneMatch::PartialMatch`], and no hit at all is
    /// [`ZoneMatch::NotFound`].
    pub fn find(&self, name: &Name) -> ZoneTableAnswer<F> {
        for skip in 0..name.len() {
            if let Some(probe) = name.suffix(skip) {
                if let Some(finder) = self.zones.get(&probe) {
                    let code = if skip == 0 {
                        ZoneMatch::Success
                    } else {
                        ZoneMatch::PartialMatch
                    };
                    return ZoneTableAnswer {
                        code,
                        finder: Some(finder),
                    };
                }
            }
        }
        ZoneTableAnswer {
            code: ZoneMatch::NotFound,
            finder: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

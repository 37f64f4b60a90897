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

//! The [`ResponseBuilder`] trait, the resolver's output seam.

use crate::rcode::Rcode;
use crate::rr::SharedRrset;

/// The section of a DNS response message an RRset belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

/// The sink the resolver writes a response into.
///
/// Concrete implementations serialize to the wire (handling name
/// compression, truncation, and EDNS as they see fit); the resolver
/// treats the builder as opaque and only ever appends. Within one
/// query, sections are filled in the order answer, authority,
/// additional, and the RRsets within a section arrive in the order the
/// resolution algorithm produced them.
///
/// The `dnssec_ok` argument to [`add_rrset`](Self::add_rrset) tells the
/// builder whether the client asked for DNSSEC data, so that an
/// implementation carrying signatures alongside its RRsets knows
/// whether to render them.
pub trait ResponseBuilder {
    /// Sets the RCODE of the response.
    fn set_rcode(&mut self, rcode: Rcode);

    /// Sets or clears the AA (authoritative answer) header bit.
    fn set_aa(&mut self, aa: bool);

    /// Appends an RRset to the given section.
    fn add_rrset(&mut self, section: Section, rrset: &SharedRrset, dnssec_ok: bool);
}

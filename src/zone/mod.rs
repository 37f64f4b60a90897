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

//! Zone data access: the [`ZoneFinder`] trait, the in-memory
//! [`TreeZone`] implementation, and the [`ZoneTable`].
//!
//! Answering a DNS query is a two-step lookup, per [RFC 1034 § 4.3.2]:
//! first the zone that is the nearest ancestor to QNAME is selected
//! (step 2), and then that zone is searched for the queried name and
//! type (step 3). The [`ZoneTable`] implements the first step; the
//! [`ZoneFinder`] trait is the interface to the second.
//!
//! `ZoneFinder` abstracts how zone data is stored. The provided
//! [`TreeZone`] keeps a zone in memory as a tree of nodes mirroring the
//! DNS hierarchy, with the side indexes needed to serve DNSSEC-signed
//! zones. Other implementations might read an on-disk database or query
//! an SQL server; the resolver does not care, so long as the
//! [`find`](ZoneFinder::find), [`find_all`](ZoneFinder::find_all), and
//! [`find_nsec3`](ZoneFinder::find_nsec3) contracts below are honored.
//!
//! [RFC 1034 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-4.3.2

use std::fmt;

use crate::class::Class;
use crate::name::Name;
use crate::rr::{SharedRrset, Type};

mod error;
mod table;
mod tree;

pub use error::Error;
pub use table::{ZoneMatch, ZoneTable, ZoneTableAnswer};
pub use tree::{TreeZone, ValidationIssue};

////////////////////////////////////////////////////////////////////////
// ZONE FINDER TRAIT                                                  //
////////////////////////////////////////////////////////////////////////

/// Trait for per-zone lookups.
///
/// A `ZoneFinder` answers questions about a single zone. The resolver
/// drives it through three operations:
///
/// * [`find`](Self::find) classifies a `(name, type)` pair within the
///   zone and returns the relevant RRset;
/// * [`find_all`](Self::find_all) is the `find` variant for QTYPE `*`
///   (ANY), returning every RRset at the matched node; and
/// * [`find_nsec3`](Self::find_nsec3) locates the NSEC3 records that
///   match or cover a name's hash, for denial-of-existence proofs in
///   NSEC3-signed zones.
pub trait ZoneFinder {
    /// Returns the origin (apex) name of the zone.
    fn origin(&self) -> &Name;

    /// Returns the DNS class of the zone.
    fn class(&self) -> Class;

    /// Looks up records of the given type at the provided domain name.
    ///
    /// The result code is determined in this order:
    ///
    /// 1. An NS RRset at a node strictly between the apex and `name`
    ///    (or at `name` itself, unless the queried type is DS) yields
    ///    [`FindCode::Delegation`] with the delegating NS RRset—unless
    ///    [`FindOptions::glue_ok`] is set, in which case the search
    ///    continues below the cut.
    /// 2. A DNAME RRset at a node strictly above `name` yields
    ///    [`FindCode::Dname`] with the DNAME RRset.
    /// 3. If the exact node exists: its RRset of the queried type
    ///    ([`FindCode::Success`]), else its CNAME
    ///    ([`FindCode::Cname`]), else [`FindCode::NxRrset`].
    /// 4. If no exact node exists but `*.<closest encloser>` does (and
    ///    [`FindOptions::no_wildcard`] is not set), the wildcard's data
    ///    is used as in step 3, with the owner rewritten to `name` and
    ///    the `wildcard` flag set.
    /// 5. Otherwise, [`FindCode::NxDomain`].
    ///
    /// When [`FindOptions::dnssec`] is set and the zone is NSEC-signed,
    /// `NxDomain` and `NxRrset` results carry the proving NSEC RRset.
    fn find(&self, name: &Name, rr_type: Type, options: FindOptions) -> FindResult;

    /// Looks up *all* records at the provided domain name (for QTYPE
    /// ANY). On [`FindCode::Success`] the returned vector holds every
    /// RRset at the matched node; otherwise the result is as
    /// [`find`](Self::find) and the vector is empty.
    fn find_all(&self, name: &Name, options: FindOptions) -> (FindResult, Vec<SharedRrset>);

    /// Finds NSEC3 records relevant to `name` (RFC 5155).
    ///
    /// When `recursive` is false, returns the NSEC3 whose hashed owner
    /// matches `name`'s hash, or failing that the one that *covers* it;
    /// `matched` distinguishes the two cases.
    ///
    /// When `recursive` is true, walks from `name` toward the apex
    /// until some enclosing name's hash matches an NSEC3 exactly (the
    /// "closest encloser"); that NSEC3 is returned as `closest_proof`,
    /// with `closest_labels` set to the encloser's label count, and the
    /// NSEC3 covering the *next closer* name is returned as
    /// `next_proof`. If `name` itself matches, `next_proof` is absent.
    fn find_nsec3(&self, name: &Name, recursive: bool) -> Result<Nsec3Result, Nsec3Error>;
}

////////////////////////////////////////////////////////////////////////
// FIND OPTIONS AND RESULTS                                           //
////////////////////////////////////////////////////////////////////////

/// Options provided to [`ZoneFinder::find`] and
/// [`ZoneFinder::find_all`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FindOptions {
    /// Requests that negative results carry the NSEC/NSEC3 data proving
    /// them, when the zone is signed.
    pub dnssec: bool,

    /// Disables referral generation: the search continues below zone
    /// cuts into non-authoritative data. Use this to look up glue
    /// addresses.
    pub glue_ok: bool,

    /// Suppresses wildcard substitution. The resolver uses this to
    /// prove that a query name would not exist without a wildcard
    /// match.
    pub no_wildcard: bool,
}

impl FindOptions {
    /// Returns options with the `dnssec` flag set from `dnssec_ok`.
    pub fn dnssec(dnssec_ok: bool) -> Self {
        Self {
            dnssec: dnssec_ok,
            ..Self::default()
        }
    }
}

/// The classification of a [`ZoneFinder::find`] outcome.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FindCode {
    /// The requested RRset was found.
    Success,

    /// The node exists and carries a CNAME instead of the requested
    /// type.
    Cname,

    /// An ancestor of the name carries a DNAME.
    Dname,

    /// The lookup crossed a zone cut; the delegating NS RRset is
    /// returned.
    Delegation,

    /// The name does not exist in the zone.
    NxDomain,

    /// The name exists but has no RRset of the requested type.
    NxRrset,
}

/// The result of a [`ZoneFinder::find`] call.
#[derive(Clone, Debug)]
pub struct FindResult {
    /// The outcome classification.
    pub code: FindCode,

    /// The RRset relevant to the outcome: the answer for
    /// [`FindCode::Success`], the CNAME/DNAME/NS RRset for those codes,
    /// and—when requested with [`FindOptions::dnssec`] and the zone is
    /// NSEC-signed—the proving NSEC for the negative codes.
    pub rrset: Option<SharedRrset>,

    /// Whether the zone is signed with NSEC.
    pub nsec_signed: bool,

    /// Whether the zone is signed with NSEC3.
    pub nsec3_signed: bool,

    /// Whether the answer (or the NXRRSET determination) came from a
    /// wildcard substitution.
    pub wildcard: bool,
}

/// The result of a [`ZoneFinder::find_nsec3`] call.
#[derive(Clone, Debug)]
pub struct Nsec3Result {
    /// The NSEC3 RRset matching (or, in non-recursive mode, possibly
    /// covering) the closest provable encloser.
    pub closest_proof: SharedRrset,

    /// In recursive mode, the NSEC3 RRset covering the next closer
    /// name, when the queried name itself did not match.
    pub next_proof: Option<SharedRrset>,

    /// Whether `closest_proof` matches the queried name's hash exactly
    /// (as opposed to covering it).
    pub matched: bool,

    /// The label count of the closest provable encloser.
    pub closest_labels: u8,
}

/// An error from [`ZoneFinder::find_nsec3`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Nsec3Error {
    /// The zone is not NSEC3-signed; `find_nsec3` has no meaning.
    NotSigned,

    /// The zone's NSEC3 chain is incomplete: no matching or covering
    /// record could be located for a name it must account for.
    BrokenChain,
}

impl fmt::Display for Nsec3Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::NotSigned => f.write_str("the zone is not NSEC3-signed"),
            Self::BrokenChain => f.write_str("the zone's NSEC3 chain is incomplete"),
        }
    }
}

impl std::error::Error for Nsec3Error {}

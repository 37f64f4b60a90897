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

//! The [`TreeZone`] structure, the default [`ZoneFinder`]
//! implementation.

use std::collections::btree_map::{self, BTreeMap};
use std::ops::Bound;
use std::sync::Arc;

use data_encoding::BASE32_DNSSEC;
use log::warn;
use sha1::{Digest, Sha1};

use super::{Error, FindCode, FindOptions, FindResult, Nsec3Error, Nsec3Result, ZoneFinder};
use crate::class::Class;
use crate::name::{Label, LabelBuf, Name};
use crate::rr::{Rdata, Rrset, SharedRrset, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// STRUCTURE AND CONSTRUCTION                                         //
////////////////////////////////////////////////////////////////////////

/// An in-memory zone that mirrors the DNS's tree structure and stores
/// the children of each node in an ordered map.
///
/// A `TreeZone` keeps the contents of a DNS zone in memory. Its lookup
/// implementation follows the [RFC 1034 § 4.3.2] reference algorithm
/// closely, so the source code is a good place to go to understand how
/// DNS lookups work. The children of each node are kept in a
/// [`BTreeMap`] (rather than a hash map) because serving DNSSEC-signed
/// zones requires ordered access to names.
///
/// In addition to the tree itself, a `TreeZone` maintains two side
/// indexes that make denial-of-existence proofs cheap: the zone's NSEC
/// RRsets in canonical name order, and its NSEC3 RRsets keyed by the
/// hash decoded from their owner names. Both are kept up to date by
/// [`TreeZone::add`].
///
/// Intermediate nodes created while adding a record (for instance,
/// `b.example.com.` when only `a.b.example.com.` owns records) carry no
/// RRsets of their own. They are the zone's *empty non-terminals*:
/// their names exist for lookup purposes, and queries for them yield
/// "no data" rather than "no such name" answers.
///
/// [RFC 1034 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-4.3.2
#[derive(Clone, Debug)]
pub struct TreeZone {
    class: Class,
    apex: Node,
    nsec_index: BTreeMap<Name, SharedRrset>,
    nsec3_index: BTreeMap<Vec<u8>, SharedRrset>,
    nsec3_settings: Option<Nsec3Settings>,
}

#[derive(Clone, Debug)]
struct Node {
    name: Name,
    rrsets: BTreeMap<Type, SharedRrset>,
    children: BTreeMap<LabelBuf, Node>,
}

impl Node {
    fn new(name: Name) -> Self {
        Self {
            name,
            rrsets: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Gets or creates a descendant node corresponding to `name`. Any
    /// nodes between the target descendant node and `self` will also be
    /// created. `level` should be set so that `self` corresponds to the
    /// label `name[level]`.
    fn get_or_create_descendant(&mut self, name: &Name, level: usize) -> &mut Self {
        if level == 0 {
            self
        } else {
            self.children
                .entry(LabelBuf::from(&name[level - 1]))
                .or_insert_with(|| Self::new(name.suffix(level - 1).unwrap()))
                .get_or_create_descendant(name, level - 1)
        }
    }
}

impl TreeZone {
    /// Creates a new `TreeZone` with the specified apex name and class.
    /// The zone is initially empty.
    pub fn new(apex: Name, class: Class) -> Self {
        Self {
            class,
            apex: Node::new(apex),
            nsec_index: BTreeMap::new(),
            nsec3_index: BTreeMap::new(),
            nsec3_settings: None,
        }
    }

    /// Adds a record to the `TreeZone`.
    ///
    /// This is designed with the "zone file" paradigm in mind: records
    /// are added in a "flat" manner, one by one. The implementation
    /// takes care of organizing records into RRsets attached to nodes
    /// mirroring the conceptual DNS tree, and of maintaining the NSEC
    /// and NSEC3 indexes used for denial-of-existence proofs.
    ///
    /// This will fail if the provided owner is not within the zone, if
    /// the record's class does not match the zone, if the record's TTL
    /// does not match other records in its RRset, or if an NSEC3 record
    /// is malformed.
    pub fn add(
        &mut self,
        owner: &Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: &Rdata,
    ) -> Result<(), Error> {
        if !owner.eq_or_subdomain_of(&self.apex.name) {
            return Err(Error::NotInZone);
        }
        if class != self.class {
            return Err(Error::ClassMismatch);
        }

        if rr_type == Type::NSEC3PARAM {
            self.capture_nsec3param(owner, rdata)?;
        }

        // The hashed-owner decode can fail, so do it before touching
        // the tree.
        let nsec3_hash = if rr_type == Type::NSEC3 {
            Some(self.decode_nsec3_owner(owner, rdata)?)
        } else {
            None
        };

        let level = owner.len() - self.apex.name.len();
        let shared = {
            let node = self.apex.get_or_create_descendant(owner, level);
            match node.rrsets.entry(rr_type) {
                btree_map::Entry::Occupied(mut entry) => {
                    if entry.get().ttl != ttl {
                        return Err(Error::TtlMismatch);
                    }
                    Arc::make_mut(entry.get_mut()).push_rdata(rdata);
                    entry.get().clone()
                }
                btree_map::Entry::Vacant(entry) => {
                    let mut rrset = Rrset::new(owner.clone(), rr_type, class, ttl);
                    rrset.push_rdata(rdata);
                    entry.insert(Arc::new(rrset)).clone()
                }
            }
        };

        // Keep the denial indexes pointing at the node's current RRset.
        if rr_type == Type::NSEC {
            self.nsec_index.insert(owner.clone(), shared);
        } else if let Some(hash) = nsec3_hash {
            self.nsec3_index.insert(hash, shared);
        }
        Ok(())
    }

    /// Records the zone's NSEC3 parameters from an NSEC3PARAM record.
    fn capture_nsec3param(&mut self, owner: &Name, rdata: &Rdata) -> Result<(), Error> {
        let params = rdata.nsec3param().ok_or(Error::BadNsec3Rdata)?;
        if owner != &self.apex.name {
            warn!(
                "ignoring NSEC3PARAM at {}, which is not the apex of zone {}",
                owner, self.apex.name,
            );
        } else if params.hash_alg != NSEC3_HASH_ALG_SHA1 {
            warn!(
                "zone {} uses unknown NSEC3 hash algorithm {}; its NSEC3 chain will not be served",
                self.apex.name, params.hash_alg,
            );
        } else if self.nsec3_settings.is_none() {
            self.nsec3_settings = Some(Nsec3Settings {
                iterations: params.iterations,
                salt: params.salt.to_vec(),
            });
        }
        Ok(())
    }

    /// Decodes the hash from an NSEC3 record's owner name. The owner
    /// must consist of a single base32hex label directly under the
    /// apex.
    fn decode_nsec3_owner(&self, owner: &Name, rdata: &Rdata) -> Result<Vec<u8>, Error> {
        rdata.nsec3().ok_or(Error::BadNsec3Rdata)?;
        if owner.len() != self.apex.name.len() + 1 {
            return Err(Error::BadNsec3Owner);
        }
        let label = owner[0].octets().to_ascii_lowercase();
        BASE32_DNSSEC
            .decode(&label)
            .map_err(|_| Error::BadNsec3Owner)
    }

    /// Returns whether the zone carries an NSEC chain.
    fn is_nsec_signed(&self) -> bool {
        !self.nsec_index.is_empty()
    }

    /// Returns whether the zone carries a servable NSEC3 chain.
    fn is_nsec3_signed(&self) -> bool {
        self.nsec3_settings.is_some() && !self.nsec3_index.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////
// NSEC3 HASHING                                                      //
////////////////////////////////////////////////////////////////////////

/// The SHA-1 NSEC3 hash algorithm number (the only one defined).
const NSEC3_HASH_ALG_SHA1: u8 = 1;

/// The zone's NSEC3 parameters, captured from its NSEC3PARAM record.
#[derive(Clone, Debug)]
struct Nsec3Settings {
    iterations: u16,
    salt: Vec<u8>,
}

impl Nsec3Settings {
    /// Computes the NSEC3 hash of a domain name per [RFC 5155 § 5]:
    /// iterated SHA-1 over the lowercased wire form of the name,
    /// with the salt appended at every step.
    ///
    /// [RFC 5155 § 5]: https://datatracker.ietf.org/doc/html/rfc5155#section-5
    fn hash_name(&self, name: &Name) -> Vec<u8> {
        let wire = name.wire_repr().to_ascii_lowercase();
        let mut hasher = Sha1::new();
        hasher.update(&wire);
        hasher.update(&self.salt);
        let mut digest = hasher.finalize();
        for _ in 0..self.iterations {
            let mut hasher = Sha1::new();
            hasher.update(&digest);
            hasher.update(&self.salt);
            digest = hasher.finalize();
        }
        digest.to_vec()
    }
}

////////////////////////////////////////////////////////////////////////
// THE LOOKUP ALGORITHM                                               //
////////////////////////////////////////////////////////////////////////

/// The outcome of descending the tree toward a name.
enum Search<'a> {
    /// The name was matched, either exactly or through a wildcard. In
    /// the wildcard case `node` is the wildcard node itself; owner
    /// rewriting is left to the caller.
    Match { node: &'a Node, wildcard: bool },

    /// The descent crossed a zone cut.
    Delegation(SharedRrset),

    /// The descent passed a node owning a DNAME.
    Dname(SharedRrset),

    /// The name does not exist in the zone.
    Missing,
}

impl TreeZone {
    fn search(&self, name: &Name, rr_type: Type, options: FindOptions) -> Search {
        if !name.eq_or_subdomain_of(&self.apex.name) {
            warn!(
                "zone {} was asked about {}, which is outside of it",
                self.apex.name, name,
            );
            return Search::Missing;
        }
        let level = name.len() - self.apex.name.len();
        search_impl(&self.apex, name, level, rr_type, options, true)
    }
}

/// Implements the DNS lookup algorithm.
///
/// `node` is the deepest node we have matched so far; this node
/// corresponds to the label `name[level]`. If we have not reached the
/// target node, the function attempts to recursively match down the
/// tree. We need to keep track of whether we're at the zone apex, since
/// NS records there never delegate, so the first call should set
/// `at_apex` to `true`.
fn search_impl<'a>(
    node: &'a Node,
    name: &Name,
    level: usize,
    rr_type: Type,
    options: FindOptions,
    at_apex: bool,
) -> Search<'a> {
    // If the node has an NS record, that triggers a referral—even when
    // the node is the target node. The exceptions: glue lookups search
    // right through cuts, and a DS query for the cut itself is answered
    // here on the parent side (RFC 4035 § 3.1.4.1).
    if !at_apex && !options.glue_ok {
        if let Some(ns_rrset) = node.rrsets.get(&Type::NS) {
            if !(level == 0 && rr_type == Type::DS) {
                return Search::Delegation(ns_rrset.clone());
            }
        }
    }

    if level == 0 {
        Search::Match {
            node,
            wildcard: false,
        }
    } else {
        // A DNAME redirects everything below its owner (RFC 6672), so
        // it only matters at nodes strictly above the target.
        if let Some(dname_rrset) = node.rrsets.get(&Type::DNAME) {
            return Search::Dname(dname_rrset.clone());
        }

        // Try to traverse down the tree. If deeper nodes do not exist,
        // then this node is the "closest encloser" (see RFC 4592 §
        // 3.3.1), and we search for a wildcard domain name to be the
        // "source of synthesis" for the response.
        if let Some(subnode) = node.children.get(&name[level - 1]) {
            search_impl(subnode, name, level - 1, rr_type, options, false)
        } else if options.no_wildcard {
            Search::Missing
        } else if let Some(source_of_synthesis) = node.children.get(Label::asterisk()) {
            Search::Match {
                node: source_of_synthesis,
                wildcard: true,
            }
        } else {
            Search::Missing
        }
    }
}

impl TreeZone {
    /// Returns `rrset`, rewriting its owner to `qname` when it was
    /// matched through a wildcard.
    fn expand(&self, rrset: &SharedRrset, wildcard: bool, qname: &Name) -> SharedRrset {
        if wildcard {
            Arc::new(rrset.with_owner(qname.clone()))
        } else {
            rrset.clone()
        }
    }

    /// Returns the NSEC RRset whose owner most closely precedes (or
    /// equals) `name` in canonical order. In a properly NSEC-signed
    /// zone, this is the RRset covering a nonexistent `name`.
    fn covering_nsec(&self, name: &Name) -> Option<SharedRrset> {
        self.nsec_index
            .range((Bound::Unbounded, Bound::Included(name)))
            .next_back()
            .map(|(_, rrset)| rrset.clone())
    }

    /// Returns the proving NSEC for a "no data" answer at `node`: the
    /// node's own NSEC if it has one, or—for empty non-terminals, which
    /// own no records at all—the NSEC covering `name`.
    fn no_data_nsec(&self, node: &Node, name: &Name) -> Option<SharedRrset> {
        node.rrsets
            .get(&Type::NSEC)
            .cloned()
            .or_else(|| self.covering_nsec(name))
    }

    /// Returns the NSEC3 RRset covering (not matching) `hash`, with the
    /// wraparound semantics of RFC 5155: a hash before the first owner
    /// in hash order is covered by the chain's last record.
    fn covering_nsec3(&self, hash: &[u8]) -> Option<SharedRrset> {
        self.nsec3_index
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(hash)))
            .next_back()
            .or_else(|| self.nsec3_index.iter().next_back())
            .map(|(_, rrset)| rrset.clone())
    }

    fn result(&self, code: FindCode, rrset: Option<SharedRrset>, wildcard: bool) -> FindResult {
        FindResult {
            code,
            rrset,
            nsec_signed: self.is_nsec_signed(),
            nsec3_signed: self.is_nsec3_signed(),
            wildcard,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ZONE FINDER IMPLEMENTATION                                         //
////////////////////////////////////////////////////////////////////////

impl ZoneFinder for TreeZone {
    fn origin(&self) -> &Name {
        &self.apex.name
    }

    fn class(&self) -> Class {
        self.class
    }

    fn find(&self, name: &Name, rr_type: Type, options: FindOptions) -> FindResult {
        debug_assert!(rr_type != Type::ANY, "use find_all for ANY queries");
        match self.search(name, rr_type, options) {
            Search::Match { node, wildcard } => {
                if let Some(rrset) = node.rrsets.get(&rr_type) {
                    let rrset = self.expand(rrset, wildcard, name);
                    self.result(FindCode::Success, Some(rrset), wildcard)
                } else if let Some(cname) = node
                    .rrsets
                    .get(&Type::CNAME)
                    .filter(|_| rr_type != Type::CNAME)
                {
                    let cname = self.expand(cname, wildcard, name);
                    self.result(FindCode::Cname, Some(cname), wildcard)
                } else {
                    let proof = if options.dnssec && self.is_nsec_signed() {
                        self.no_data_nsec(node, name)
                    } else {
                        None
                    };
                    self.result(FindCode::NxRrset, proof, wildcard)
                }
            }
            Search::Delegation(ns_rrset) => {
                self.result(FindCode::Delegation, Some(ns_rrset), false)
            }
            Search::Dname(dname_rrset) => self.result(FindCode::Dname, Some(dname_rrset), false),
            Search::Missing => {
                let proof = if options.dnssec && self.is_nsec_signed() {
                    self.covering_nsec(name)
                } else {
                    None
                };
                self.result(FindCode::NxDomain, proof, false)
            }
        }
    }

    fn find_all(&self, name: &Name, options: FindOptions) -> (FindResult, Vec<SharedRrset>) {
        match self.search(name, Type::ANY, options) {
            Search::Match { node, wildcard } => {
                if node.rrsets.is_empty() {
                    // An empty non-terminal: the name exists, but there
                    // is nothing to return.
                    let proof = if options.dnssec && self.is_nsec_signed() {
                        self.no_data_nsec(node, name)
                    } else {
                        None
                    };
                    (self.result(FindCode::NxRrset, proof, wildcard), Vec::new())
                } else {
                    let rrsets = node
                        .rrsets
                        .values()
                        .map(|rrset| self.expand(rrset, wildcard, name))
                        .collect();
                    (self.result(FindCode::Success, None, wildcard), rrsets)
                }
            }
            Search::Delegation(ns_rrset) => (
                self.result(FindCode::Delegation, Some(ns_rrset), false),
                Vec::new(),
            ),
            Search::Dname(dname_rrset) => (
                self.result(FindCode::Dname, Some(dname_rrset), false),
                Vec::new(),
            ),
            Search::Missing => {
                let proof = if options.dnssec && self.is_nsec_signed() {
                    self.covering_nsec(name)
                } else {
                    None
                };
                (self.result(FindCode::NxDomain, proof, false), Vec::new())
            }
        }
    }

    fn find_nsec3(&self, name: &Name, recursive: bool) -> Result<Nsec3Result, Nsec3Error> {
        let settings = self.nsec3_settings.as_ref().ok_or(Nsec3Error::NotSigned)?;
        if self.nsec3_index.is_empty() {
            return Err(Nsec3Error::BrokenChain);
        }

        if !recursive {
            let hash = settings.hash_name(name);
            if let Some(matching) = self.nsec3_index.get(&hash) {
                Ok(Nsec3Result {
                    closest_proof: matching.clone(),
                    next_proof: None,
                    matched: true,
                    closest_labels: name.len() as u8,
                })
            } else {
                let covering = self.covering_nsec3(&hash).ok_or(Nsec3Error::BrokenChain)?;
                Ok(Nsec3Result {
                    closest_proof: covering,
                    next_proof: None,
                    matched: false,
                    closest_labels: name.len() as u8,
                })
            }
        } else {
            // Walk toward the apex until some enclosing name's hash has
            // a matching NSEC3: the closest provable encloser. The
            // previous (one label longer) candidate is then the next
            // closer name, whose covering NSEC3 completes the proof.
            let mut next_closer_hash: Option<Vec<u8>> = None;
            for skip in 0..name.len() {
                let candidate = match name.suffix(skip) {
                    Some(candidate) => candidate,
                    None => break,
                };
                let hash = settings.hash_name(&candidate);
                if let Some(matching) = self.nsec3_index.get(&hash) {
                    let next_proof = match next_closer_hash {
                        Some(hash) => {
                            Some(self.covering_nsec3(&hash).ok_or(Nsec3Error::BrokenChain)?)
                        }
                        None => None,
                    };
                    return Ok(Nsec3Result {
                        closest_proof: matching.clone(),
                        next_proof,
                        matched: skip == 0,
                        closest_labels: candidate.len() as u8,
                    });
                }
                next_closer_hash = Some(hash);
            }
            Err(Nsec3Error::BrokenChain)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// VALIDATION                                                         //
////////////////////////////////////////////////////////////////////////

/// A semantic problem detected by [`TreeZone::validate`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationIssue {
    /// The apex does not own an SOA RRset.
    MissingApexSoa,

    /// The apex SOA RRset contains more than one record.
    MultipleApexSoas,

    /// The apex does not own an NS RRset.
    MissingApexNs,

    /// The named node owns a CNAME alongside other data.
    CnameAndOtherData(Name),

    /// The zone carries both an NSEC chain and an NSEC3 chain.
    MixedDenialChains,

    /// The zone has an NSEC3PARAM record but no NSEC3 records.
    Nsec3ParamWithoutChain,

    /// The zone has NSEC3 records but no usable NSEC3PARAM record.
    Nsec3ChainWithoutParam,
}

impl TreeZone {
    /// Checks the zone for semantic errors: a missing or duplicated
    /// apex SOA, missing apex NS, CNAMEs mixed with other data, and
    /// inconsistent denial-of-existence chains.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        match self.apex.rrsets.get(&Type::SOA) {
            None => issues.push(ValidationIssue::MissingApexSoa),
            Some(soa) if soa.rdatas.len() > 1 => issues.push(ValidationIssue::MultipleApexSoas),
            Some(_) => (),
        }
        if !self.apex.rrsets.contains_key(&Type::NS) {
            issues.push(ValidationIssue::MissingApexNs);
        }
        check_cnames(&self.apex, &mut issues);
        if self.is_nsec_signed() && self.is_nsec3_signed() {
            issues.push(ValidationIssue::MixedDenialChains);
        }
        if self.nsec3_settings.is_some() && self.nsec3_index.is_empty() {
            issues.push(ValidationIssue::Nsec3ParamWithoutChain);
        }
        if self.nsec3_settings.is_none() && !self.nsec3_index.is_empty() {
            issues.push(ValidationIssue::Nsec3ChainWithoutParam);
        }
        issues
    }
}

/// Recursively checks that no node owns a CNAME alongside other data.
/// DNSSEC records are exempt, since a signed zone legitimately places
/// RRSIG and NSEC at aliases (RFC 4035 § 2.5).
fn check_cnames(node: &Node, issues: &mut Vec<ValidationIssue>) {
    if node.rrsets.contains_key(&Type::CNAME) {
        let mixed = node
            .rrsets
            .keys()
            .any(|&t| t != Type::CNAME && t != Type::RRSIG && t != Type::NSEC);
        if mixed {
            issues.push(ValidationIssue::CnameAndOtherData(node.name.clone()));
        }
    }
    for child in node.children.values() {
        check_cnames(child, issues);
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;

    lazy_static! {
        static ref APEX: Name = "example.com.".parse().unwrap();
        static ref OUTSIDE: Name = "example.net.".parse().unwrap();
    }

    const LOCALHOST: &[u8] = &[127, 0, 0, 1];

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    fn rdata(octets: &[u8]) -> &Rdata {
        octets.try_into().unwrap()
    }

    fn new_zone() -> TreeZone {
        TreeZone::new(APEX.clone(), Class::IN)
    }

    fn add(zone: &mut TreeZone, owner: &str, rr_type: Type, octets: &[u8]) {
        zone.add(&name(owner), rr_type, Class::IN, Ttl::from(3600), rdata(octets))
            .unwrap();
    }

    /// Builds NSEC RDATA with the given next name and a placeholder
    /// type bitmap.
    fn nsec_rdata(next: &str) -> Vec<u8> {
        let mut octets = name(next).wire_repr().to_vec();
        octets.extend_from_slice(&[0, 1, 0x40]);
        octets
    }

    ////////////////////////////////////////////////////////////////////
    // BUILD TESTS                                                    //
    ////////////////////////////////////////////////////////////////////

    #[test]
    fn add_rejects_mismatched_class() {
        let mut zone = new_zone();
        assert_eq!(
            zone.add(&APEX, Type::A, Class::CH, Ttl::from(3600), rdata(LOCALHOST)),
            Err(Error::ClassMismatch),
        );
    }

    #[test]
    fn add_rejects_mismatched_ttl() {
        let mut zone = new_zone();
        add(&mut zone, "example.com.", Type::A, LOCALHOST);
        assert_eq!(
            zone.add(&APEX, Type::A, Class::IN, Ttl::from(7200), rdata(LOCALHOST)),
            Err(Error::TtlMismatch),
        );
    }

    #[test]
    fn add_rejects_owner_outside_of_zone() {
        let mut zone = new_zone();
        assert_eq!(
            zone.add(&OUTSIDE, Type::A, Class::IN, Ttl::from(3600), rdata(LOCALHOST)),
            Err(Error::NotInZone),
        );
    }

    ////////////////////////////////////////////////////////////////////
    // LOOKUP TESTS                                                   //
    ////////////////////////////////////////////////////////////////////

    #[test]
    fn find_works() {
        let mut zone = new_zone();
        add(&mut zone, "a.example.com.", Type::A, LOCALHOST);
        let result = zone.find(&name("a.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
        let rrset = result.rrset.unwrap();
        assert_eq!(rrset.owner, name("a.example.com."));
        assert_eq!(rrset.rdatas.first().unwrap().octets(), LOCALHOST);
        assert!(!result.wildcard);
    }

    #[test]
    fn find_handles_nxdomain_and_no_data() {
        let mut zone = new_zone();
        add(&mut zone, "a.example.com.", Type::A, LOCALHOST);
        let result = zone.find(&name("b.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::NxDomain);
        let result = zone.find(&name("a.example.com."), Type::AAAA, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
        assert!(result.rrset.is_none());
    }

    #[test]
    fn empty_non_terminals_yield_no_data() {
        let mut zone = new_zone();
        add(&mut zone, "a.b.example.com.", Type::A, LOCALHOST);
        // b.example.com. was created as an empty non-terminal; it
        // exists but owns nothing.
        let result = zone.find(&name("b.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
        assert!(result.rrset.is_none());
    }

    #[test]
    fn find_handles_cname() {
        let mut zone = new_zone();
        let target = name("a.example.com.");
        add(&mut zone, "cn.example.com.", Type::CNAME, target.wire_repr());
        let result = zone.find(&name("cn.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::Cname);
        assert_eq!(result.rrset.unwrap().rr_type, Type::CNAME);

        // A query for the CNAME itself is an ordinary success.
        let result = zone.find(&name("cn.example.com."), Type::CNAME, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
    }

    #[test]
    fn referral_processing_works() {
        let mut zone = new_zone();
        let ns = name("ns.sub.example.com.");
        add(&mut zone, "sub.example.com.", Type::NS, ns.wire_repr());
        add(&mut zone, "ns.sub.example.com.", Type::A, LOCALHOST);

        // We expect a referral, even when the target name is the
        // delegation point.
        for qname in ["x.sub.example.com.", "sub.example.com.", "ns.sub.example.com."] {
            let result = zone.find(&name(qname), Type::A, FindOptions::default());
            assert_eq!(result.code, FindCode::Delegation);
            assert_eq!(result.rrset.unwrap().owner, name("sub.example.com."));
        }

        // With glue_ok, lookups enter non-authoritative data.
        let options = FindOptions {
            glue_ok: true,
            ..FindOptions::default()
        };
        let result = zone.find(&ns, Type::A, options);
        assert_eq!(result.code, FindCode::Success);
    }

    #[test]
    fn apex_ns_does_not_delegate() {
        let mut zone = new_zone();
        let ns = name("ns1.example.com.");
        add(&mut zone, "example.com.", Type::NS, ns.wire_repr());
        add(&mut zone, "ns1.example.com.", Type::A, LOCALHOST);
        let result = zone.find(&ns, Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
    }

    #[test]
    fn ds_is_answered_at_the_delegation_point() {
        let mut zone = new_zone();
        let ns = name("ns.sub.example.com.");
        add(&mut zone, "sub.example.com.", Type::NS, ns.wire_repr());
        add(&mut zone, "sub.example.com.", Type::DS, &[0x30, 0x39, 8, 2, 0xab]);

        // DS at the cut itself: answered from the parent side.
        let result = zone.find(&name("sub.example.com."), Type::DS, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);

        // But anything below the cut still refers.
        let result = zone.find(&name("x.sub.example.com."), Type::DS, FindOptions::default());
        assert_eq!(result.code, FindCode::Delegation);
    }

    #[test]
    fn ds_without_records_is_no_data_at_the_cut() {
        let mut zone = new_zone();
        let ns = name("ns.sub.example.com.");
        add(&mut zone, "sub.example.com.", Type::NS, ns.wire_repr());
        let result = zone.find(&name("sub.example.com."), Type::DS, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
    }

    #[test]
    fn dname_redirects_subdomains_only() {
        let mut zone = new_zone();
        let target = name("target.example.net.");
        add(&mut zone, "dn.example.com.", Type::DNAME, target.wire_repr());

        let result = zone.find(&name("foo.dn.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::Dname);
        assert_eq!(result.rrset.unwrap().owner, name("dn.example.com."));

        // The owner itself is not redirected.
        let result = zone.find(&name("dn.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
        let result = zone.find(&name("dn.example.com."), Type::DNAME, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
    }

    // RFC 4592 § 2.2.1 provides examples of wildcard synthesis. We
    // replicate the examples here, since (a) it verifies the
    // correctness of our wildcard processing, and (b) it's in general a
    // nice workout for the lookup code.

    static RFC_4592_MX: &[u8] = b"\x00\x0a\x05host1\x07example\x00";
    static RFC_4592_NS1: &[u8] = b"\x02ns\x07example\x03com\x00";
    static RFC_4592_NS2: &[u8] = b"\x02ns\x07example\x03net\x00";
    static RFC_4592_WILDCARD_TXT: &[u8] = b"\x12this is a wildcard";
    static RFC_4592_ZONE: &[(&str, Type, &[u8])] = &[
        ("example.", Type::SOA, b"<SOA RDATA>"),
        ("example.", Type::NS, RFC_4592_NS1),
        ("example.", Type::NS, RFC_4592_NS2),
        ("*.example.", Type::TXT, RFC_4592_WILDCARD_TXT),
        ("*.example.", Type::MX, RFC_4592_MX),
        ("sub.*.example.", Type::TXT, b"\x16this is not a wildcard"),
        ("host1.example.", Type::A, b"\xc0\x00\x02\x01"),
        ("_ssh._tcp.host1.example.", Type::SRV, b"<SRV DATA>"),
        ("_ssh._tcp.host2.example.", Type::SRV, b"<SRV DATA>"),
        ("subdel.example.", Type::NS, RFC_4592_NS1),
        ("subdel.example.", Type::NS, RFC_4592_NS2),
    ];

    fn rfc_4592_zone() -> TreeZone {
        let mut zone = TreeZone::new(name("example."), Class::IN);
        for &(owner, rr_type, octets) in RFC_4592_ZONE {
            add(&mut zone, owner, rr_type, octets);
        }
        zone
    }

    #[test]
    fn rfc_4592_examples() {
        let zone = rfc_4592_zone();

        // The following are synthesized from a wildcard; their owners
        // are rewritten to the query name.
        let result = zone.find(&name("host3.example."), Type::MX, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
        assert!(result.wildcard);
        let rrset = result.rrset.unwrap();
        assert_eq!(rrset.owner, name("host3.example."));
        assert_eq!(rrset.rdatas.first().unwrap().octets(), RFC_4592_MX);

        let result = zone.find(&name("host3.example."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
        assert!(result.wildcard);

        let result = zone.find(&name("foo.bar.example."), Type::TXT, FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
        assert!(result.wildcard);
        assert_eq!(result.rrset.unwrap().owner, name("foo.bar.example."));

        // The following do not trigger wildcard synthesis. (See RFC
        // 4592 § 2.2.1 for the reasons why!)
        let result = zone.find(&name("host1.example."), Type::MX, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
        assert!(!result.wildcard);

        let result = zone.find(&name("sub.*.example."), Type::MX, FindOptions::default());
        assert_eq!(result.code, FindCode::NxRrset);
        assert!(!result.wildcard);

        let result = zone.find(
            &name("_telnet._tcp.host1.example."),
            Type::SRV,
            FindOptions::default(),
        );
        assert_eq!(result.code, FindCode::NxDomain);

        let result = zone.find(&name("host.subdel.example."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::Delegation);

        let result = zone.find(&name("ghost.*.example."), Type::MX, FindOptions::default());
        assert_eq!(result.code, FindCode::NxDomain);
    }

    #[test]
    fn no_wildcard_suppresses_synthesis() {
        let zone = rfc_4592_zone();
        let options = FindOptions {
            no_wildcard: true,
            ..FindOptions::default()
        };
        let result = zone.find(&name("host3.example."), Type::MX, options);
        assert_eq!(result.code, FindCode::NxDomain);
    }

    #[test]
    fn find_all_returns_every_rrset() {
        let mut zone = new_zone();
        add(&mut zone, "a.example.com.", Type::A, LOCALHOST);
        add(&mut zone, "a.example.com.", Type::TXT, b"\x05hello");
        let (result, rrsets) = zone.find_all(&name("a.example.com."), FindOptions::default());
        assert_eq!(result.code, FindCode::Success);
        let types: Vec<Type> = rrsets.iter().map(|rrset| rrset.rr_type).collect();
        assert_eq!(types, [Type::A, Type::TXT]);
    }

    ////////////////////////////////////////////////////////////////////
    // NSEC TESTS                                                     //
    ////////////////////////////////////////////////////////////////////

    /// A small NSEC-signed zone: apex, a, c (with a gap at b), and a
    /// wildcard under wild.
    fn nsec_zone() -> TreeZone {
        let mut zone = new_zone();
        add(&mut zone, "example.com.", Type::SOA, b"<SOA RDATA>");
        add(&mut zone, "example.com.", Type::NS, RFC_4592_NS1);
        add(&mut zone, "a.example.com.", Type::A, LOCALHOST);
        add(&mut zone, "c.example.com.", Type::A, LOCALHOST);
        add(&mut zone, "*.wild.example.com.", Type::A, LOCALHOST);
        add(&mut zone, "example.com.", Type::NSEC, &nsec_rdata("a.example.com."));
        add(&mut zone, "a.example.com.", Type::NSEC, &nsec_rdata("c.example.com."));
        add(&mut zone, "c.example.com.", Type::NSEC, &nsec_rdata("*.wild.example.com."));
        add(
            &mut zone,
            "*.wild.example.com.",
            Type::NSEC,
            &nsec_rdata("example.com."),
        );
        zone
    }

    #[test]
    fn nxdomain_carries_the_covering_nsec() {
        let zone = nsec_zone();
        let result = zone.find(&name("b.example.com."), Type::A, FindOptions::dnssec(true));
        assert_eq!(result.code, FindCode::NxDomain);
        assert!(result.nsec_signed);
        let proof = result.rrset.unwrap();
        assert_eq!(proof.rr_type, Type::NSEC);
        assert_eq!(proof.owner, name("a.example.com."));
    }

    #[test]
    fn no_data_carries_the_nodes_nsec() {
        let zone = nsec_zone();
        let result = zone.find(&name("a.example.com."), Type::AAAA, FindOptions::dnssec(true));
        assert_eq!(result.code, FindCode::NxRrset);
        let proof = result.rrset.unwrap();
        assert_eq!(proof.rr_type, Type::NSEC);
        assert_eq!(proof.owner, name("a.example.com."));
    }

    #[test]
    fn wildcard_no_data_carries_the_wildcards_nsec() {
        let zone = nsec_zone();
        let result = zone.find(
            &name("xx.wild.example.com."),
            Type::AAAA,
            FindOptions::dnssec(true),
        );
        assert_eq!(result.code, FindCode::NxRrset);
        assert!(result.wildcard);
        let proof = result.rrset.unwrap();
        assert_eq!(proof.rr_type, Type::NSEC);
        assert_eq!(proof.owner, name("*.wild.example.com."));
    }

    #[test]
    fn proofs_are_omitted_without_the_dnssec_option() {
        let zone = nsec_zone();
        let result = zone.find(&name("b.example.com."), Type::A, FindOptions::default());
        assert_eq!(result.code, FindCode::NxDomain);
        assert!(result.rrset.is_none());
        assert!(result.nsec_signed);
    }

    ////////////////////////////////////////////////////////////////////
    // NSEC3 TESTS                                                    //
    ////////////////////////////////////////////////////////////////////

    #[test]
    fn nsec3_hash_matches_the_rfc_5155_vectors() {
        // RFC 5155 Appendix A hashes the zone "example." with SHA-1,
        // salt aabbccdd, and 12 iterations.
        let settings = Nsec3Settings {
            iterations: 12,
            salt: vec![0xaa, 0xbb, 0xcc, 0xdd],
        };
        let hash = settings.hash_name(&name("example."));
        assert_eq!(
            BASE32_DNSSEC.encode(&hash),
            "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom",
        );
    }

    /// Builds an NSEC3-signed zone over the given existing names. The
    /// NSEC3 records are constructed programmatically: one per name, in
    /// hash order, each pointing at the next.
    fn nsec3_zone(apex: &str, names: &[&str]) -> TreeZone {
        let settings = Nsec3Settings {
            iterations: 2,
            salt: vec![0xaa, 0xbb],
        };
        let mut zone = TreeZone::new(name(apex), Class::IN);
        add(&mut zone, apex, Type::SOA, b"<SOA RDATA>");

        // NSEC3PARAM: SHA-1, no flags, 2 iterations, salt aabb.
        add(&mut zone, apex, Type::NSEC3PARAM, &[1, 0, 0, 2, 2, 0xaa, 0xbb]);

        let mut hashes: Vec<Vec<u8>> = names.iter().map(|n| settings.hash_name(&name(n))).collect();
        hashes.sort();
        for (i, hash) in hashes.iter().enumerate() {
            let owner = format!("{}.{}", BASE32_DNSSEC.encode(hash), apex);
            let next = &hashes[(i + 1) % hashes.len()];
            let mut octets = vec![1, 0, 0, 2, 2, 0xaa, 0xbb];
            octets.push(next.len() as u8);
            octets.extend_from_slice(next);
            octets.extend_from_slice(&[0, 1, 0x40]);
            add(&mut zone, &owner, Type::NSEC3, &octets);
        }
        zone
    }

    #[test]
    fn find_nsec3_matches_existing_names() {
        let zone = nsec3_zone("example.", &["example.", "a.example.", "c.e.example."]);
        let result = zone.find_nsec3(&name("a.example."), false).unwrap();
        assert!(result.matched);
        assert_eq!(result.closest_labels, 3);

        let settings = Nsec3Settings {
            iterations: 2,
            salt: vec![0xaa, 0xbb],
        };
        let expected_label = BASE32_DNSSEC.encode(&settings.hash_name(&name("a.example.")));
        assert_eq!(
            result.closest_proof.owner,
            name(&format!("{}.example.", expected_label)),
        );
    }

    #[test]
    fn find_nsec3_covers_missing_names() {
        let zone = nsec3_zone("example.", &["example.", "a.example.", "c.e.example."]);
        let result = zone.find_nsec3(&name("zz.example."), false).unwrap();
        assert!(!result.matched);

        // The covering record's owner hash must precede the query
        // hash, or be the chain's last record (wraparound).
        let settings = Nsec3Settings {
            iterations: 2,
            salt: vec![0xaa, 0xbb],
        };
        let query_hash = settings.hash_name(&name("zz.example."));
        let owner_label = result.closest_proof.owner[0].octets().to_ascii_lowercase();
        let owner_hash = BASE32_DNSSEC.decode(&owner_label).unwrap();
        let last_hash = zone.nsec3_index.keys().next_back().unwrap();
        assert!(owner_hash < query_hash || &owner_hash == last_hash);
    }

    #[test]
    fn find_nsec3_recursive_finds_the_closest_encloser() {
        let zone = nsec3_zone("example.", &["example.", "a.example.", "c.e.example."]);

        // x.y.c.e.example.: closest encloser is c.e.example. (3 + 1
        // labels), next closer is y.c.e.example.
        let result = zone.find_nsec3(&name("x.y.c.e.example."), true).unwrap();
        assert!(!result.matched);
        assert_eq!(result.closest_labels, 4);
        assert!(result.next_proof.is_some());

        // An existing name matches directly, with no next-closer proof.
        let result = zone.find_nsec3(&name("c.e.example."), true).unwrap();
        assert!(result.matched);
        assert_eq!(result.closest_labels, 4);
        assert!(result.next_proof.is_none());
    }

    #[test]
    fn find_nsec3_fails_on_unsigned_zones() {
        let zone = new_zone();
        assert_eq!(
            zone.find_nsec3(&name("a.example.com."), false).err(),
            Some(Nsec3Error::NotSigned),
        );
    }

    ////////////////////////////////////////////////////////////////////
    // VALIDATION TESTS                                               //
    ////////////////////////////////////////////////////////////////////

    #[test]
    fn validate_flags_missing_apex_records() {
        let zone = new_zone();
        let issues = zone.validate();
        assert!(issues.contains(&ValidationIssue::MissingApexSoa));
        assert!(issues.contains(&ValidationIssue::MissingApexNs));
    }

    #[test]
    fn validate_flags_cname_and_other_data() {
        let mut zone = new_zone();
        add(&mut zone, "example.com.", Type::SOA, b"<SOA RDATA>");
        add(&mut zone, "example.com.", Type::NS, RFC_4592_NS1);
        let target = name("a.example.com.");
        add(&mut zone, "cn.example.com.", Type::CNAME, target.wire_repr());
        add(&mut zone, "cn.example.com.", Type::TXT, b"\x05mixed");
        assert!(zone
            .validate()
            .contains(&ValidationIssue::CnameAndOtherData(name("cn.example.com."))));
    }

    #[test]
    fn validate_accepts_a_clean_zone() {
        let mut zone = new_zone();
        add(&mut zone, "example.com.", Type::SOA, b"<SOA RDATA>");
        add(&mut zone, "example.com.", Type::NS, RFC_4592_NS1);
        add(&mut zone, "a.example.com.", Type::A, LOCALHOST);
        assert!(zone.validate().is_empty());
    }
}

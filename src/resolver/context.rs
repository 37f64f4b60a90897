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

//! The [`FindContext`] structure: proof and additional-data machinery
//! layered over a primary zone lookup.

use std::cmp::max;
use std::sync::Arc;

use super::ResolveError;
use crate::name::Name;
use crate::rr::{Rrset, SharedRrset, Type};
use crate::zone::{FindCode, FindOptions, FindResult, ZoneFinder};

/// Context for one query's interaction with its zone.
///
/// A `FindContext` is built from the primary
/// [`find`](ZoneFinder::find)/[`find_all`](ZoneFinder::find_all) result
/// and carries everything the later stages of response construction
/// need: the additional-section lookups, the apex NS/SOA fetches, the
/// DNAME-to-CNAME synthesis, and the NSEC/NSEC3 proofs for negative,
/// wildcard, and delegation answers.
///
/// The proof methods re-query the zone through the [`ZoneFinder`]
/// trait. An implementation that kept tree positions from the primary
/// lookup could answer them without re-descending; the trait
/// deliberately leaves room for that, and this context is where such
/// state would live.
pub(super) struct FindContext<'a, F> {
    finder: &'a F,
    qname: &'a Name,
    qtype: Type,
    dnssec: bool,
    code: FindCode,
    rrset: Option<SharedRrset>,
    nsec_signed: bool,
    nsec3_signed: bool,
    wildcard: bool,
}

impl<'a, F> FindContext<'a, F>
where
    F: ZoneFinder,
{
    pub(super) fn new(
        finder: &'a F,
        qname: &'a Name,
        qtype: Type,
        result: &FindResult,
        dnssec: bool,
    ) -> Self {
        Self {
            finder,
            qname,
            qtype,
            dnssec,
            code: result.code,
            rrset: result.rrset.clone(),
            nsec_signed: result.nsec_signed,
            nsec3_signed: result.nsec3_signed,
            wildcard: result.wildcard,
        }
    }

    fn options(&self) -> FindOptions {
        FindOptions::dnssec(self.dnssec)
    }

    ////////////////////////////////////////////////////////////////////
    // APEX RRSET FETCHES                                             //
    ////////////////////////////////////////////////////////////////////

    /// Fetches the NS or SOA RRset at the zone origin. A missing apex
    /// RRset is a zone-integrity failure.
    pub(super) fn at_origin(&self, rr_type: Type) -> Result<SharedRrset, ResolveError> {
        let error = match rr_type {
            Type::SOA => ResolveError::NoSoa,
            _ => ResolveError::NoApexNs,
        };
        let result = self
            .finder
            .find(self.finder.origin(), rr_type, self.options());
        if result.code != FindCode::Success {
            return Err(error);
        }
        result.rrset.ok_or(error)
    }

    ////////////////////////////////////////////////////////////////////
    // ADDITIONAL-SECTION PROCESSING                                  //
    ////////////////////////////////////////////////////////////////////

    /// Performs additional-section processing for one RRset: for RR
    /// types embedding a server name (NS and MX), looks up A and AAAA
    /// RRsets for each in-bailiwick target and appends any found to
    /// `additionals`.
    ///
    /// NS targets are looked up in "glue OK" mode, since the addresses
    /// of delegated nameservers live below the zone cut.
    pub(super) fn additionals_for(&self, rrset: &Rrset, additionals: &mut Vec<SharedRrset>) {
        let (offset, glue_ok) = match rrset.rr_type {
            Type::NS => (0, true),
            Type::MX => (2, false),
            _ => return,
        };
        let options = FindOptions {
            glue_ok,
            ..self.options()
        };
        for rdata in rrset.rdatas.iter() {
            let target = match rdata.name_at(offset) {
                Some(target) => target,
                None => continue,
            };
            if !target.eq_or_subdomain_of(self.finder.origin()) {
                // Out of bailiwick; nothing we provide here could be
                // trusted anyway.
                continue;
            }
            for rr_type in [Type::A, Type::AAAA] {
                let result = self.finder.find(&target, rr_type, options);
                if result.code == FindCode::Success {
                    if let Some(rrset) = result.rrset {
                        additionals.push(rrset);
                    }
                }
            }
        }
    }

    ////////////////////////////////////////////////////////////////////
    // DNAME SYNTHESIS                                                //
    ////////////////////////////////////////////////////////////////////

    /// Synthesizes the CNAME that a DNAME implies for the query name
    /// (RFC 6672 § 3.1) and appends it to `answers`. Returns `true` on
    /// success and `false` when the synthesized target would be too
    /// long, in which case the response must carry rcode YXDOMAIN and
    /// nothing is appended.
    ///
    /// The synthesized CNAME is unsigned even in signed zones: the
    /// DNAME itself is signed, and validators reconstruct the CNAME
    /// from it.
    pub(super) fn synthesized_cname(
        &self,
        answers: &mut Vec<SharedRrset>,
    ) -> Result<bool, ResolveError> {
        let dname_rrset = self.rrset.as_ref().ok_or(ResolveError::UnexpectedCode)?;
        let dname_target = dname_rrset
            .rdatas
            .first()
            .and_then(|rdata| rdata.name_at(0))
            .ok_or(ResolveError::UnexpectedCode)?;

        // The unmatched prefix of the query name, i.e. the labels below
        // the DNAME owner.
        let prefix = self
            .qname
            .prefix(self.qname.len() - dname_rrset.owner.len())
            .ok_or(ResolveError::UnexpectedCode)?;
        let target = match prefix.concatenate(&dname_target) {
            Ok(target) => target,
            // RFC 6672 § 2.3: a too-long synthesized name is YXDOMAIN.
            Err(_) => return Ok(false),
        };

        let mut cname = Rrset::new(
            self.qname.clone(),
            Type::CNAME,
            dname_rrset.class,
            dname_rrset.ttl,
        );
        let rdata = target
            .wire_repr()
            .try_into()
            .map_err(|_| ResolveError::UnexpectedCode)?;
        cname.push_rdata(rdata);
        answers.push(Arc::new(cname));
        Ok(true)
    }

    ////////////////////////////////////////////////////////////////////
    // DNSSEC PROOFS                                                  //
    ////////////////////////////////////////////////////////////////////

    /// Appends the proof that a wildcard-derived positive answer is
    /// legitimate: the query name itself does not exist in the zone
    /// (RFC 4035 § 3.1.3.3; RFC 5155 § 7.2.6).
    pub(super) fn wildcard_proof(
        &self,
        proofs: &mut Vec<SharedRrset>,
    ) -> Result<(), ResolveError> {
        if self.nsec_signed {
            // The query name shouldn't exist in the zone if there were
            // no wildcard substitution. Confirm that by looking it up
            // with wildcard matching suppressed; the result must be
            // NXDOMAIN with its proving NSEC.
            let options = FindOptions {
                no_wildcard: true,
                ..FindOptions::dnssec(true)
            };
            let result = self.finder.find(self.qname, Type::NSEC, options);
            let rrset = match (result.code, result.rrset) {
                (FindCode::NxDomain, Some(rrset)) if !rrset.rdatas.is_empty() => rrset,
                _ => return Err(ResolveError::BadNsec),
            };
            proofs.push(rrset);
        } else if self.nsec3_signed {
            // The closest encloser must be the immediate ancestor of
            // the matching wildcard, so the NSEC3 covering the next
            // closer name (and only that NSEC3) is what the RFC asks
            // for.
            self.closest_encloser_proof(self.qname, proofs, false, false)?;
        }
        Ok(())
    }

    /// Appends the denial proofs for a negative answer (NXDOMAIN or
    /// NXRRSET).
    pub(super) fn negative_proof(
        &self,
        proofs: &mut Vec<SharedRrset>,
    ) -> Result<(), ResolveError> {
        match self.code {
            FindCode::NxDomain => {
                if self.nsec_signed {
                    self.nxdomain_proof_by_nsec(proofs)?;
                } else if self.nsec3_signed {
                    // The closest encloser proof (RFC 5155 § 7.2.2),
                    // plus an NSEC3 covering the wildcard at the
                    // closest encloser.
                    let closest_labels =
                        self.closest_encloser_proof(self.qname, proofs, false, true)?;
                    let wildname = self.wildcard_at(closest_labels)?;
                    proofs.push(self.nsec3_for_name(&wildname, false)?);
                }
            }
            FindCode::NxRrset => {
                if self.nsec_signed {
                    // The finder already attached the direct proof.
                    if let Some(rrset) = self.rrset.clone() {
                        proofs.push(rrset);
                    }
                } else if self.nsec3_signed && !self.wildcard {
                    if self.qtype == Type::DS {
                        // RFC 5155 § 7.2.4: either a matching NSEC3 for
                        // the query name or, with opt-out in effect, a
                        // closest-encloser proof.
                        self.closest_encloser_proof(self.qname, proofs, true, true)?;
                    } else {
                        // RFC 5155 § 7.2.3: the NSEC3 matching the
                        // query name.
                        proofs.push(self.nsec3_for_name(self.qname, true)?);
                    }
                }
                if self.wildcard {
                    self.wildcard_no_data_proof(proofs)?;
                }
            }
            _ => return Err(ResolveError::UnexpectedCode),
        }
        Ok(())
    }

    /// Appends the NSEC proofs for NXDOMAIN: the covering NSEC the
    /// finder returned, plus the NSEC proving that no wildcard could
    /// have matched (when that is a different RRset).
    fn nxdomain_proof_by_nsec(&self, proofs: &mut Vec<SharedRrset>) -> Result<(), ResolveError> {
        let rrset = match self.rrset.clone() {
            Some(rrset) => rrset,
            None => return Ok(()),
        };
        if rrset.rdatas.is_empty() {
            return Err(ResolveError::BadNsec);
        }
        let no_wildcard = self.no_wildcard_nsec(&rrset)?;
        proofs.push(rrset.clone());
        // Sometimes one NSEC proves both; only add the wildcard proof
        // when it's a distinct RRset.
        if rrset.owner != no_wildcard.owner {
            proofs.push(no_wildcard);
        }
        Ok(())
    }

    /// Finds the NSEC proving that no wildcard matches the query name.
    ///
    /// The best possible wildcard is the longer common suffix of the
    /// query name with either the owner or the next-name of the NSEC
    /// that proved NXDOMAIN, prefixed by the `*` label. For query name
    /// a.b.example.com., if the NXDOMAIN NSEC is
    /// `b.example.com. NSEC c.example.com.`, the longer suffix is
    /// b.example.com. and the best possible wildcard is
    /// *.b.example.com.
    fn no_wildcard_nsec(&self, nsec: &SharedRrset) -> Result<SharedRrset, ResolveError> {
        let next_name = nsec
            .rdatas
            .first()
            .and_then(|rdata| rdata.name_at(0))
            .ok_or(ResolveError::BadNsec)?;
        let olabels = self.qname.compare(&nsec.owner).common_labels;
        let nlabels = self.qname.compare(&next_name).common_labels;
        let common_labels = max(olabels, nlabels);
        let wildname = self.wildcard_at(common_labels as u8)?;

        // The wildcard must not exist; otherwise we shouldn't have got
        // NXDOMAIN for the original query in the first place.
        let result = self.finder.find(&wildname, Type::NSEC, FindOptions::dnssec(true));
        match (result.code, result.rrset) {
            (FindCode::NxDomain, Some(rrset)) if !rrset.rdatas.is_empty() => Ok(rrset),
            _ => Err(ResolveError::BadNsec),
        }
    }

    /// Appends the proofs for a wildcard-derived NXRRSET (RFC 4035
    /// § 3.1.3.4; RFC 5155 § 7.2.5).
    fn wildcard_no_data_proof(&self, proofs: &mut Vec<SharedRrset>) -> Result<(), ResolveError> {
        if self.nsec_signed {
            // One NSEC (already returned by the finder and appended by
            // the caller) shows the wildcard lacks the type; a second
            // shows no closer name matches the query, unless it's the
            // same RRset.
            let rrset = self.rrset.as_ref().ok_or(ResolveError::BadNsec)?;
            if rrset.rdatas.is_empty() {
                return Err(ResolveError::BadNsec);
            }
            let options = FindOptions {
                no_wildcard: true,
                ..FindOptions::dnssec(true)
            };
            let result = self.finder.find(self.qname, Type::NSEC, options);
            let no_match = match (result.code, result.rrset) {
                (FindCode::NxDomain, Some(rrset)) if !rrset.rdatas.is_empty() => rrset,
                _ => return Err(ResolveError::BadNsec),
            };
            if rrset.owner != no_match.owner {
                proofs.push(no_match);
            }
        } else if self.nsec3_signed {
            // RFC 5155 § 7.2.5: closest encloser proof for the query
            // name, plus the NSEC3 matching the wildcard.
            let closest_labels = self.closest_encloser_proof(self.qname, proofs, false, true)?;
            let wildname = self.wildcard_at(closest_labels)?;
            proofs.push(self.nsec3_for_name(&wildname, true)?);
        }
        Ok(())
    }

    /// Appends the DS or denial-of-DS proof for a delegation (RFC 4035
    /// § 3.1.4; RFC 5155 § 7.2.7).
    pub(super) fn delegation_proof(
        &self,
        proofs: &mut Vec<SharedRrset>,
    ) -> Result<(), ResolveError> {
        let delegation = self.rrset.as_ref().ok_or(ResolveError::BadDs)?;
        let result = self
            .finder
            .find(&delegation.owner, Type::DS, FindOptions::dnssec(true));
        match result.code {
            FindCode::Success => {
                proofs.push(result.rrset.ok_or(ResolveError::BadDs)?);
                Ok(())
            }
            FindCode::NxRrset if result.nsec_signed => {
                if let Some(nsec) = result.rrset {
                    proofs.push(nsec);
                    Ok(())
                } else {
                    Err(ResolveError::BadDs)
                }
            }
            FindCode::NxRrset if result.nsec3_signed => {
                // Opt-out (RFC 5155 § 6) means an unsigned delegation
                // may have no NSEC3 of its own; accept an exact match
                // or a closest-encloser proof.
                self.closest_encloser_proof(&delegation.owner, proofs, true, true)?;
                Ok(())
            }
            _ => Err(ResolveError::BadDs),
        }
    }

    ////////////////////////////////////////////////////////////////////
    // NSEC3 HELPERS                                                  //
    ////////////////////////////////////////////////////////////////////

    /// Obtains the closest-encloser proof for `name` (RFC 5155
    /// § 7.2.1) and appends it to `proofs`: the NSEC3 matching the
    /// closest (provable) encloser, then the NSEC3 covering the next
    /// closer name. Returns the label count of the closest encloser.
    ///
    /// When `exact_ok` is false, a direct match on `name` itself (which
    /// leaves no next-closer proof) is treated as a zone defect. When
    /// `add_closest` is false, only the next-closer NSEC3 is appended.
    fn closest_encloser_proof(
        &self,
        name: &Name,
        proofs: &mut Vec<SharedRrset>,
        exact_ok: bool,
        add_closest: bool,
    ) -> Result<u8, ResolveError> {
        let result = self
            .finder
            .find_nsec3(name, true)
            .map_err(|_| ResolveError::BadNsec3)?;
        if !exact_ok && result.next_proof.is_none() {
            return Err(ResolveError::BadNsec3);
        }
        if add_closest {
            proofs.push(result.closest_proof);
        }
        if let Some(next_proof) = result.next_proof {
            proofs.push(next_proof);
        }
        Ok(result.closest_labels)
    }

    /// Finds the NSEC3 for `name`, requiring it to be a match or a
    /// cover per `expect_match`.
    fn nsec3_for_name(&self, name: &Name, expect_match: bool) -> Result<SharedRrset, ResolveError> {
        let result = self
            .finder
            .find_nsec3(name, false)
            .map_err(|_| ResolveError::BadNsec3)?;
        if result.matched != expect_match {
            return Err(ResolveError::BadNsec3);
        }
        Ok(result.closest_proof)
    }

    /// Constructs the wildcard name at the ancestor of the query name
    /// that has `labels` labels (`*` prepended to that suffix).
    fn wildcard_at(&self, labels: u8) -> Result<Name, ResolveError> {
        let suffix = self
            .qname
            .suffix(self.qname.len() - labels as usize)
            .ok_or(ResolveError::BadNsec)?;
        Name::wildcard()
            .concatenate(&suffix)
            .map_err(|_| ResolveError::BadNsec)
    }
}

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

//! The query-resolution state machine.
//!
//! [`process`] answers one question against a [`ZoneTable`]: it selects
//! the zone that should answer (with the parent-zone rule for DS
//! queries), dispatches on the zone finder's classification of the
//! name, and writes the answer, authority, and additional sections into
//! a [`ResponseBuilder`], including the NSEC/NSEC3 denial-of-existence
//! proofs that [RFC 4035] and [RFC 5155] require of signed zones.
//!
//! The resolver does not chase CNAMEs (it appends the CNAME and lets
//! the client follow it) and never leaves the selected zone; both are
//! deliberate properties of an authoritative-only server.
//!
//! [RFC 4035]: https://datatracker.ietf.org/doc/html/rfc4035
//! [RFC 5155]: https://datatracker.ietf.org/doc/html/rfc5155

use std::fmt;

use log::{debug, warn};

use crate::class::Class;
use crate::name::Name;
use crate::rcode::Rcode;
use crate::response::{ResponseBuilder, Section};
use crate::rr::{SharedRrset, Type};
use crate::zone::{FindCode, FindOptions, ZoneFinder, ZoneMatch, ZoneTable, ZoneTableAnswer};

mod context;

use context::FindContext;

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// A zone-integrity failure encountered while resolving a query.
///
/// These are not client-visible response codes: they mean the zone data
/// (or a [`ZoneFinder`] implementation) is broken in a way that makes a
/// correct answer impossible. The query must be abandoned; the
/// transport layer renders the condition as SERVFAIL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolveError {
    /// An NSEC RRset needed for a proof was missing, empty, or in the
    /// wrong place.
    BadNsec,

    /// An NSEC3 RRset needed for a proof was missing or did not
    /// match/cover as required.
    BadNsec3,

    /// The DS lookup for a delegation returned something other than
    /// the DS RRset or a provable denial.
    BadDs,

    /// The zone has no SOA at its apex.
    NoSoa,

    /// The zone has no NS at its apex.
    NoApexNs,

    /// A [`ZoneFinder`] returned a classification the resolver cannot
    /// handle, or a required RRset was absent from its result.
    UnexpectedCode,

    /// A name operation overflowed the 255-octet limit outside of DNAME
    /// synthesis (where it is a client-visible YXDOMAIN instead).
    NameTooLong,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::BadNsec => f.write_str("bad NSEC data in zone"),
            Self::BadNsec3 => f.write_str("bad NSEC3 data in zone"),
            Self::BadDs => f.write_str("unexpected result for delegation DS lookup"),
            Self::NoSoa => f.write_str("zone has no SOA at its apex"),
            Self::NoApexNs => f.write_str("zone has no NS at its apex"),
            Self::UnexpectedCode => f.write_str("unexpected zone finder result"),
            Self::NameTooLong => f.write_str("name construction exceeded the wire-length limit"),
        }
    }
}

impl std::error::Error for ResolveError {}

////////////////////////////////////////////////////////////////////////
// THE ENTRY POINT                                                    //
////////////////////////////////////////////////////////////////////////

/// Answers one query.
///
/// The response (sections, AA bit, and RCODE) is written into
/// `builder`, and the final RCODE is also returned. An `Err` means a
/// zone-integrity failure; the caller should discard whatever was
/// written and respond with SERVFAIL.
pub fn process<F, B>(
    table: &ZoneTable<F>,
    builder: &mut B,
    qname: &Name,
    qtype: Type,
    qclass: Class,
    dnssec_ok: bool,
) -> Result<Rcode, ResolveError>
where
    F: ZoneFinder,
    B: ResponseBuilder,
{
    if qclass != table.class() {
        debug!("refusing query for {}/{}: unsupported class {}", qname, qtype, qclass);
        return Ok(refuse(builder));
    }

    let answer = find_zone(table, qname, qtype);
    let finder = match answer.finder {
        Some(finder) => finder.as_ref(),
        None => {
            // A failed search for the parent zone of a DS query may
            // still leave us with authority at the child side.
            if qtype == Type::DS && qname.len() > 1 {
                if let Some(rcode) = process_ds_at_child(table, builder, qname, dnssec_ok)? {
                    return Ok(rcode);
                }
            }
            debug!("refusing query for {}/{}: no authoritative zone", qname, qtype);
            return Ok(refuse(builder));
        }
    };

    let result = answer_from_zone(table, finder, builder, qname, qtype, dnssec_ok);
    if let Err(ref error) = result {
        warn!("query for {}/{} failed: {}", qname, qtype, error);
    }
    result
}

/// Sets up a REFUSED response.
fn refuse<B: ResponseBuilder>(builder: &mut B) -> Rcode {
    builder.set_aa(false);
    builder.set_rcode(Rcode::Refused);
    Rcode::Refused
}

/// Selects the zone to answer from. Normally this is the nearest
/// ancestor to the query name, but a DS query belongs to the parent
/// side of the zone cut, so for those we probe with the query name
/// stripped of its first label. (If the query name is the root, there
/// is no parent, and the deepest zone we have is the right one.)
fn find_zone<'a, F>(table: &'a ZoneTable<F>, qname: &Name, qtype: Type) -> ZoneTableAnswer<'a, F>
where
    F: ZoneFinder,
{
    if qtype == Type::DS {
        if let Some(parent) = qname.suffix(1) {
            return table.find(&parent);
        }
    }
    table.find(qname)
}

////////////////////////////////////////////////////////////////////////
// THE STATE MACHINE                                                  //
////////////////////////////////////////////////////////////////////////

/// Builds the response for a query against the selected zone.
fn answer_from_zone<F, B>(
    table: &ZoneTable<F>,
    finder: &F,
    builder: &mut B,
    qname: &Name,
    qtype: Type,
    dnssec_ok: bool,
) -> Result<Rcode, ResolveError>
where
    F: ZoneFinder,
    B: ResponseBuilder,
{
    builder.set_aa(true);
    let mut rcode = Rcode::NoError;
    let options = FindOptions::dnssec(dnssec_ok);
    let qtype_is_any = qtype == Type::ANY;
    let (result, any_answers) = if qtype_is_any {
        finder.find_all(qname, options)
    } else {
        (finder.find(qname, qtype, options), Vec::new())
    };
    let ctx = FindContext::new(finder, qname, qtype, &result, dnssec_ok);

    let mut answers = Vec::new();
    let mut authorities = Vec::new();
    let mut additionals = Vec::new();

    match result.code {
        FindCode::Success => {
            if qtype_is_any {
                answers.extend(any_answers);
            } else {
                answers.push(result.rrset.clone().ok_or(ResolveError::UnexpectedCode)?);
            }
            for rrset in &answers {
                ctx.additionals_for(rrset, &mut additionals);
            }

            // If the apex NS RRset is not itself the answer, it goes
            // into the authority section, along with addresses for the
            // servers it names.
            let answer_is_apex_ns =
                qname == finder.origin() && (qtype == Type::NS || qtype_is_any);
            if !answer_is_apex_ns {
                let ns_rrset = ctx.at_origin(Type::NS)?;
                ctx.additionals_for(&ns_rrset, &mut additionals);
                authorities.push(ns_rrset);
            }

            // A wildcard-derived answer needs a proof that no closer
            // name exists.
            if dnssec_ok && result.wildcard {
                ctx.wildcard_proof(&mut authorities)?;
            }
        }
        FindCode::Cname => {
            // We don't chase CNAMEs: the alias goes into the answer
            // section, and the client takes it from there.
            answers.push(result.rrset.clone().ok_or(ResolveError::UnexpectedCode)?);
            if dnssec_ok && result.wildcard {
                ctx.wildcard_proof(&mut authorities)?;
            }
        }
        FindCode::Dname => {
            // The DNAME itself, then the CNAME synthesized from it. If
            // the synthesized target would be too long, RFC 6672 § 2.3
            // calls for YXDOMAIN, with the DNAME alone in the answer.
            answers.push(result.rrset.clone().ok_or(ResolveError::UnexpectedCode)?);
            if !ctx.synthesized_cname(&mut answers)? {
                rcode = Rcode::YxDomain;
            }
        }
        FindCode::Delegation => {
            // A DS query that hit a delegation must be completed at the
            // child side if we are authoritative there too (RFC 3658
            // § 2.2.1.2).
            if qtype == Type::DS {
                if let Some(rcode) = process_ds_at_child(table, builder, qname, dnssec_ok)? {
                    return Ok(rcode);
                }
            }

            builder.set_aa(false);
            let ns_rrset = result.rrset.clone().ok_or(ResolveError::UnexpectedCode)?;
            ctx.additionals_for(&ns_rrset, &mut additionals);
            authorities.push(ns_rrset);
            if dnssec_ok {
                ctx.delegation_proof(&mut authorities)?;
            }
        }
        FindCode::NxDomain => {
            rcode = Rcode::NxDomain;
            authorities.push(ctx.at_origin(Type::SOA)?);
            if dnssec_ok {
                ctx.negative_proof(&mut authorities)?;
            }
        }
        FindCode::NxRrset => {
            authorities.push(ctx.at_origin(Type::SOA)?);
            if dnssec_ok {
                ctx.negative_proof(&mut authorities)?;
            }
        }
    }

    for rrset in &answers {
        builder.add_rrset(Section::Answer, rrset, dnssec_ok);
    }
    for rrset in &authorities {
        builder.add_rrset(Section::Authority, rrset, dnssec_ok);
    }
    write_additionals(builder, &additionals, qname, qtype, dnssec_ok);
    builder.set_rcode(rcode);
    Ok(rcode)
}

/// Writes the additional section, suppressing RRsets that duplicate the
/// question or each other.
fn write_additionals<B: ResponseBuilder>(
    builder: &mut B,
    additionals: &[SharedRrset],
    qname: &Name,
    qtype: Type,
    dnssec_ok: bool,
) {
    let mut written: Vec<(&Name, Type)> = Vec::new();
    for rrset in additionals {
        if rrset.owner == *qname && (qtype == Type::ANY || rrset.rr_type == qtype) {
            continue;
        }
        if written
            .iter()
            .any(|&(owner, rr_type)| *owner == rrset.owner && rr_type == rrset.rr_type)
        {
            continue;
        }
        builder.add_rrset(Section::Additional, rrset, dnssec_ok);
        written.push((&rrset.owner, rrset.rr_type));
    }
}

////////////////////////////////////////////////////////////////////////
// CHILD-SIDE DS HANDLING                                             //
////////////////////////////////////////////////////////////////////////

/// Answers a DS query at the child side of a zone cut, when we are
/// authoritative for the child zone itself (its apex is the query
/// name). The DS doesn't belong there, so the answer is "no data" with
/// the child's SOA—the important point is that the SOA lets the
/// resolver that contacted us hunt for the right parent zone (RFC 4035
/// § 3.1.4.1, RFC 3658 § 2.2.1.1).
///
/// Returns `None` when we hold no zone whose apex is the query name, in
/// which case the caller proceeds as usual.
fn process_ds_at_child<F, B>(
    table: &ZoneTable<F>,
    builder: &mut B,
    qname: &Name,
    dnssec_ok: bool,
) -> Result<Option<Rcode>, ResolveError>
where
    F: ZoneFinder,
    B: ResponseBuilder,
{
    let answer = table.find(qname);
    let finder = match (answer.code, answer.finder) {
        (ZoneMatch::Success, Some(finder)) => finder.as_ref(),
        _ => return Ok(None),
    };

    builder.set_aa(true);
    let ds_result = finder.find(qname, Type::DS, FindOptions::dnssec(dnssec_ok));
    let ctx = FindContext::new(finder, qname, Type::DS, &ds_result, dnssec_ok);
    let mut authorities = vec![ctx.at_origin(Type::SOA)?];

    // find(DS) here should come back NXRRSET, and if DNSSEC was
    // requested we prove it. Any other result is odd, but the SOA alone
    // still serves the purpose, so we don't bother about it.
    if ds_result.code == FindCode::NxRrset && dnssec_ok {
        ctx.negative_proof(&mut authorities)?;
    }

    for rrset in &authorities {
        builder.add_rrset(Section::Authority, rrset, dnssec_ok);
    }
    builder.set_rcode(Rcode::NoError);
    Ok(Some(Rcode::NoError))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

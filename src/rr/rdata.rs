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

//! Implementation of the [`Rdata`] type and its typed accessors.

use std::fmt;
use std::ops::Deref;

use super::Type;
use crate::name::Name;

////////////////////////////////////////////////////////////////////////
// RDATA                                                              //
////////////////////////////////////////////////////////////////////////

/// A type for record RDATA.
///
/// The RDATA of a record is limited to 65,535 octets. The `Rdata` type
/// is a wrapper over `[u8]` that can only be constructed if the
/// underlying data has a valid length.
///
/// RDATA is stored and passed around in its uncompressed on-the-wire
/// form. For RR types whose processing requires looking *inside* the
/// RDATA (NS and MX targets for additional-section processing, DNAME
/// targets for CNAME synthesis, NSEC and NSEC3 fields for denial
/// proofs, the SOA MINIMUM field for negative caching), this type
/// provides typed accessors that parse the relevant fields on demand.
#[repr(transparent)]
pub struct Rdata {
    octets: [u8],
}

impl Rdata {
    /// Converts a `&[u8]` to a `&Rdata`, without checking the length;
    /// for use within this module only.
    pub(super) fn from_unchecked(octets: &[u8]) -> &Self {
        unsafe { &*(octets as *const [u8] as *const Self) }
    }

    /// Returns the underlying octet slice.
    pub fn octets(&self) -> &[u8] {
        self
    }

    /// Parses an uncompressed domain name starting at offset `start` of
    /// the RDATA. Data following the name (e.g. an NSEC type bitmap) is
    /// ignored. Returns `None` if there is no valid name there.
    pub fn name_at(&self, start: usize) -> Option<Name> {
        self.octets
            .get(start..)
            .and_then(|octets| Name::from_wire(octets).ok())
            .map(|(name, _)| name)
    }

    /// Reads the MINIMUM field of an SOA RDATA ([RFC 1035 § 3.3.13]).
    /// Returns `None` if the RDATA is not a well-formed SOA.
    ///
    /// [RFC 1035 § 3.3.13]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.13
    pub fn soa_minimum(&self) -> Option<u32> {
        let (_, mname_len) = Name::from_wire(&self.octets).ok()?;
        let (_, rname_len) = Name::from_wire(&self.octets[mname_len..]).ok()?;
        let octets = self.octets.get(mname_len + rname_len + 16..)?;
        let array: [u8; 4] = octets.try_into().ok()?;
        Some(u32::from_be_bytes(array))
    }

    /// Parses the fixed fields of an NSEC3 RDATA ([RFC 5155 § 3.1]).
    /// The type bitmap is not parsed. Returns `None` if the RDATA is
    /// not a well-formed NSEC3.
    ///
    /// [RFC 5155 § 3.1]: https://datatracker.ietf.org/doc/html/rfc5155#section-3.1
    pub fn nsec3(&self) -> Option<Nsec3Rdata> {
        let salt_len = *self.octets.get(4)? as usize;
        let salt = self.octets.get(5..5 + salt_len)?;
        let hash_len = *self.octets.get(5 + salt_len)? as usize;
        let next_hashed_owner = self.octets.get(6 + salt_len..6 + salt_len + hash_len)?;
        Some(Nsec3Rdata {
            hash_alg: self.octets[0],
            flags: self.octets[1],
            iterations: u16::from_be_bytes([self.octets[2], self.octets[3]]),
            salt,
            next_hashed_owner,
        })
    }

    /// Parses an NSEC3PARAM RDATA ([RFC 5155 § 4.1]). Returns `None` if
    /// the RDATA is not well-formed.
    ///
    /// [RFC 5155 § 4.1]: https://datatracker.ietf.org/doc/html/rfc5155#section-4.1
    pub fn nsec3param(&self) -> Option<Nsec3Param> {
        let salt_len = *self.octets.get(4)? as usize;
        let salt = self.octets.get(5..5 + salt_len)?;
        Some(Nsec3Param {
            hash_alg: self.octets[0],
            flags: self.octets[1],
            iterations: u16::from_be_bytes([self.octets[2], self.octets[3]]),
            salt,
        })
    }
}

/// The fixed fields of an NSEC3 RDATA.
#[derive(Clone, Copy, Debug)]
pub struct Nsec3Rdata<'a> {
    pub hash_alg: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: &'a [u8],
    pub next_hashed_owner: &'a [u8],
}

/// The fields of an NSEC3PARAM RDATA.
#[derive(Clone, Copy, Debug)]
pub struct Nsec3Param<'a> {
    pub hash_alg: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: &'a [u8],
}

impl<'a> TryFrom<&'a [u8]> for &'a Rdata {
    type Error = RdataTooLongError;

    fn try_from(octets: &'a [u8]) -> Result<Self, Self::Error> {
        if octets.len() > (u16::MAX as usize) {
            Err(RdataTooLongError)
        } else {
            Ok(Rdata::from_unchecked(octets))
        }
    }
}

impl<'a, const N: usize> TryFrom<&'a [u8; N]> for &'a Rdata {
    type Error = RdataTooLongError;

    fn try_from(octets: &'a [u8; N]) -> Result<Self, Self::Error> {
        octets[..].try_into()
    }
}

impl Deref for Rdata {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.octets
    }
}

impl PartialEq for Rdata {
    fn eq(&self, other: &Self) -> bool {
        self.octets == other.octets
    }
}

impl Eq for Rdata {}

impl fmt::Debug for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x?}", &self.octets)
    }
}

/// An error signaling that a `&[u8]` cannot be converted to a `&Rdata`
/// because it is too long.
#[derive(Debug, Eq, PartialEq)]
pub struct RdataTooLongError;

impl fmt::Display for RdataTooLongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RDATA is too long")
    }
}

impl std::error::Error for RdataTooLongError {}

////////////////////////////////////////////////////////////////////////
// TYPE-AWARE EQUALITY                                                //
////////////////////////////////////////////////////////////////////////

// [RFC 3597 § 6] specifies that RRs of unknown type are equal when
// their RDATA is bitwise equal, and that new RR types should not have
// type-specific comparison rules. This means that embedded domain names
// are henceforth compared in a case-sensitive manner. Therefore, only
// types that (1) predate the RFC and (2) embed domain names need
// special comparison logic.
//
// [RFC 3597 § 6]: https://datatracker.ietf.org/doc/html/rfc3597#section-6

impl Rdata {
    /// Compares this [`Rdata`] to another, assuming that they are both
    /// of type `rr_type`. This implements special logic for types
    /// introduced before RFC 3597 that contain domain names, in which
    /// the domain names must be compared case-insensitively. A bitwise
    /// comparison is used for all later types.
    ///
    /// If, in the process of comparing domain names case-insensitively,
    /// one of the [`Rdata`]s is found to be invalid, this falls back to
    /// a bitwise comparison of the entire [`Rdata`]s.
    pub fn equals(&self, other: &Self, rr_type: Type) -> bool {
        if self.octets.len() != other.octets.len() {
            // Since equal embedded domain names are always the same
            // length (even if they contain octets of differing ASCII
            // case), the RDATAs can't be equal if they have differing
            // lengths.
            false
        } else {
            match rr_type {
                Type::NS
                | Type::MD
                | Type::MF
                | Type::CNAME
                | Type::MB
                | Type::MG
                | Type::MR
                | Type::PTR => names_equal(self, other),
                Type::SOA => fields_after_names_equal(self, other, 2, 20),
                Type::MINFO => names_only_equal(self, other, 2),
                Type::MX => fields_before_name_equal(self, other, 2),
                _ => self.octets == other.octets,
            }
        }
    }
}

/// Tests two uncompressed on-the-wire names for equality, falling back
/// to bitwise comparison if either is invalid.
fn names_equal(first: &Rdata, second: &Rdata) -> bool {
    names_only_equal(first, second, 1)
}

/// Tests RDATA consisting of exactly `n` consecutive name fields.
fn names_only_equal(first: &Rdata, second: &Rdata, n: usize) -> bool {
    match test_n_name_fields(first, second, 0, n) {
        Some(Some(len)) if len == first.len() => true,
        Some(Some(_)) => first.octets == second.octets, // Invalid: extra data
        Some(None) => false,
        None => first.octets == second.octets,
    }
}

/// Tests RDATA consisting of `n` name fields followed by `tail` octets
/// of non-name data (e.g. SOA).
fn fields_after_names_equal(first: &Rdata, second: &Rdata, n: usize, tail: usize) -> bool {
    match test_n_name_fields(first, second, 0, n) {
        Some(Some(len)) if first.len() - len == tail => {
            first.octets[len..] == second.octets[len..]
        }
        Some(Some(_)) => first.octets == second.octets, // Wrong trailing length
        Some(None) => false,
        None => first.octets == second.octets,
    }
}

/// Tests RDATA consisting of `head` octets of non-name data followed by
/// a single name field (e.g. MX).
fn fields_before_name_equal(first: &Rdata, second: &Rdata, head: usize) -> bool {
    if first.octets.get(..head) != second.octets.get(..head) {
        return false;
    }
    match test_n_name_fields(first, second, head, 1) {
        Some(Some(len)) if len == first.len() => true,
        Some(Some(_)) => first.octets == second.octets,
        Some(None) => false,
        None => first.octets == second.octets,
    }
}

/// Tests `n` consecutive name fields for equality, starting at `start`
/// in each buffer. Since the comparison logic in this module promises
/// to fall back to bitwise comparison if invalid data is encountered,
/// we have to be careful how we do things. This function returns:
///
/// * `Some(Some(len))` if all the fields were valid and equal when
///   compared case-insensitively; `len` is the end offset of the last
///   field.
/// * `Some(None)` if we can definitively say that the answer should be
///   `false` with no further (re-)comparison.
/// * `None` if, due to an invalid domain name, we can't make a decision
///   without re-comparing everything bitwise.
fn test_n_name_fields(
    first: &Rdata,
    second: &Rdata,
    start: usize,
    n: usize,
) -> Option<Option<usize>> {
    let mut offset = start;
    for _ in 0..n {
        match (
            first.octets.get(offset..).map(Name::from_wire),
            second.octets.get(offset..).map(Name::from_wire),
        ) {
            (Some(Ok((first_name, field_len))), Some(Ok((second_name, _)))) => {
                if first_name == second_name {
                    offset += field_len;
                } else {
                    // Unequal names mean unequal RDATA, full stop: a
                    // bitwise re-comparison could not make them equal.
                    return Some(None);
                }
            }
            (Some(Err(_)), Some(Err(_))) | (None, None) => {
                // Both invalid: the caller falls back to bitwise
                // comparison, including the fields already checked.
                return None;
            }
            _ => {
                // One valid, one invalid: they can't be bitwise equal
                // either.
                return Some(None);
            }
        }
    }
    Some(Some(offset))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rdata_constructor_accepts_short_slices() {
        let quite_short = &[0u8, 1, 2, 3];
        let quite_short_rdata: &Rdata = quite_short.try_into().unwrap();
        assert_eq!(quite_short_rdata.octets(), quite_short);
    }

    #[test]
    fn rdata_constructor_rejects_long_slice() {
        let too_long = vec![0u8; u16::MAX as usize + 1];
        assert_eq!(<&Rdata>::try_from(&too_long[..]), Err(RdataTooLongError));
    }

    #[test]
    fn equals_is_case_insensitive_for_old_name_types() {
        let lower: &Rdata = b"\x02ns\x07example\x00".try_into().unwrap();
        let upper: &Rdata = b"\x02NS\x07EXAMPLE\x00".try_into().unwrap();
        assert!(lower.equals(upper, Type::NS));
        assert!(!lower.equals(upper, Type::TXT));
    }

    #[test]
    fn equals_handles_mx() {
        let first: &Rdata = b"\x00\x0a\x04mail\x07example\x00".try_into().unwrap();
        let second: &Rdata = b"\x00\x0a\x04MAIL\x07example\x00".try_into().unwrap();
        let third: &Rdata = b"\x00\x14\x04mail\x07example\x00".try_into().unwrap();
        assert!(first.equals(second, Type::MX));
        assert!(!first.equals(third, Type::MX));
    }

    #[test]
    fn name_at_reads_embedded_names() {
        let mx: &Rdata = b"\x00\x0a\x04mail\x07example\x00".try_into().unwrap();
        assert_eq!(mx.name_at(2), Some("mail.example.".parse().unwrap()));
        assert_eq!(mx.name_at(64), None);
    }

    #[test]
    fn soa_minimum_reads_the_last_field() {
        let mut soa = Vec::new();
        soa.extend_from_slice(b"\x03ns1\x07example\x00"); // MNAME
        soa.extend_from_slice(b"\x05admin\x07example\x00"); // RNAME
        soa.extend_from_slice(&1u32.to_be_bytes()); // SERIAL
        soa.extend_from_slice(&7200u32.to_be_bytes()); // REFRESH
        soa.extend_from_slice(&3600u32.to_be_bytes()); // RETRY
        soa.extend_from_slice(&1209600u32.to_be_bytes()); // EXPIRE
        soa.extend_from_slice(&300u32.to_be_bytes()); // MINIMUM
        let rdata: &Rdata = soa.as_slice().try_into().unwrap();
        assert_eq!(rdata.soa_minimum(), Some(300));
    }

    #[test]
    fn nsec3_parses_fixed_fields() {
        let mut nsec3 = vec![1, 0, 0, 12, 4, 0xaa, 0xbb, 0xcc, 0xdd];
        nsec3.push(20);
        nsec3.extend_from_slice(&[0u8; 20]);
        nsec3.extend_from_slice(&[0, 1, 0x40]); // type bitmap
        let rdata: &Rdata = nsec3.as_slice().try_into().unwrap();
        let parsed = rdata.nsec3().unwrap();
        assert_eq!(parsed.hash_alg, 1);
        assert_eq!(parsed.iterations, 12);
        assert_eq!(parsed.salt, &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(parsed.next_hashed_owner, &[0u8; 20]);
    }
}

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

//! Implementation of data structures related to domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::ops::Index;
use std::str::FromStr;

use arrayvec::ArrayVec;

mod builder;
mod error;
mod label;
pub use builder::NameBuilder;
pub use error::Error;
pub use label::{Label, LabelBuf};

/// The maximum number of labels in a domain name.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A structure to represent a domain name.
///
/// A `Name` is an immutable value holding the uncompressed on-the-wire
/// representation of a fully qualified domain name ([RFC 1035 § 3.1])
/// along with its label count. The representation preserves ASCII case,
/// but all comparisons between `Name`s are case-insensitive.
///
/// `Name`s can be constructed in several ways:
///
/// * through the [`FromStr`] implementation (with the escape sequences
///   of [RFC 4343 § 2.1]);
/// * through a [`NameBuilder`];
/// * from uncompressed on-the-wire data through [`Name::from_wire`] and
///   [`Name::from_wire_all`]; and
/// * from other names through [`Name::prefix`], [`Name::suffix`], and
///   [`Name::concatenate`].
///
/// The [`Ord`] implementation is the canonical ordering of domain names
/// defined by DNSSEC ([RFC 4034 § 6.1]), which the NSEC machinery in
/// this crate relies on. For the richer comparison needed by the lookup
/// process (ancestor relations and shared-label counts), see
/// [`Name::compare`].
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
#[derive(Clone)]
pub struct Name {
    n_labels: u8,
    wire: Box<[u8]>,
}

#[allow(clippy::len_without_is_empty)] // A domain name is never empty!
impl Name {
    /// Returns the `Name` of the DNS root, `.`.
    pub fn root() -> Name {
        Name {
            n_labels: 1,
            wire: Box::new([0]),
        }
    }

    /// Returns the wildcard name at the root, `*.`. Concatenating this
    /// with another name produces the wildcard domain name at that
    /// name.
    pub fn wildcard() -> Name {
        Name {
            n_labels: 2,
            wire: Box::new([1, b'*', 0]),
        }
    }

    /// Constructs a `Name` from wire data that has already been
    /// validated. For use within this module only.
    fn from_wire_unchecked(wire: Box<[u8]>, n_labels: u8) -> Name {
        Name { n_labels, wire }
    }

    /// Returns the number of labels in this `Name`, including the null
    /// (root) label.
    pub fn len(&self) -> usize {
        self.n_labels as usize
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.n_labels == 1
    }

    /// Returns whether the `Name` is a wildcard domain name (i.e.,
    /// whether its first label is `*`).
    pub fn is_wildcard(&self) -> bool {
        self[0].is_asterisk()
    }

    /// Returns an iterator over labels in this `Name`.
    pub fn labels(&self) -> Labels {
        Labels::new(self)
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name`.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the length of the `Name`'s on-the-wire representation in
    /// octets.
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Returns the offset of label `n` in the on-the-wire
    /// representation. This will panic if `n` is out of range.
    fn label_offset(&self, n: usize) -> usize {
        let mut offset = 0;
        for _ in 0..n {
            offset += 1 + self.wire[offset] as usize;
        }
        offset
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    pub fn suffix(&self, skip: usize) -> Option<Name> {
        if skip < self.len() {
            Some(Name {
                n_labels: self.n_labels - skip as u8,
                wire: self.wire[self.label_offset(skip)..].into(),
            })
        } else {
            None
        }
    }

    /// Returns the name consisting of the first `n` labels of the
    /// `Name` followed by the null label, or `None` if `n` is not less
    /// than the label count. Note that `prefix(0)` is the root.
    pub fn prefix(&self, n: usize) -> Option<Name> {
        if n < self.len() {
            let mut wire = Vec::with_capacity(self.label_offset(n) + 1);
            wire.extend_from_slice(&self.wire[..self.label_offset(n)]);
            wire.push(0);
            Some(Name {
                n_labels: n as u8 + 1,
                wire: wire.into(),
            })
        } else {
            None
        }
    }

    /// Returns a new `Name` consisting of all non-null labels of this
    /// `Name` followed by all of `other`. This fails with
    /// [`Error::NameTooLong`] when the result would exceed 255 octets
    /// on the wire.
    pub fn concatenate(&self, other: &Name) -> Result<Name, Error> {
        let head = &self.wire[..self.wire.len() - 1];
        if head.len() + other.wire.len() > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }
        let mut wire = Vec::with_capacity(head.len() + other.wire.len());
        wire.extend_from_slice(head);
        wire.extend_from_slice(&other.wire);
        Ok(Name {
            n_labels: self.n_labels - 1 + other.n_labels,
            wire: wire.into(),
        })
    }

    /// Compares this `Name` to another, reporting the [`NameRelation`]
    /// between the two, their relative [`Ordering`] under the DNSSEC
    /// canonical ordering, and the number of trailing labels they
    /// share.
    ///
    /// Since every name ends with the null label, `common_labels` is
    /// always at least one; a value of exactly one means that the names
    /// are related only through the root.
    pub fn compare(&self, other: &Name) -> NameComparison {
        let mut common_labels = 0;
        for (a, b) in self.labels().rev().zip(other.labels().rev()) {
            match a.cmp(b) {
                Ordering::Equal => common_labels += 1,
                order => {
                    return NameComparison {
                        relation: NameRelation::CommonAncestor,
                        order,
                        common_labels,
                    }
                }
            }
        }
        let order = self.len().cmp(&other.len());
        let relation = match order {
            Ordering::Equal => NameRelation::Equal,
            Ordering::Greater => NameRelation::Subdomain,
            Ordering::Less => NameRelation::Superdomain,
        };
        NameComparison {
            relation,
            order,
            common_labels,
        }
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.len() >= other.len()
            && self
                .labels()
                .rev()
                .zip(other.labels().rev())
                .all(|(a, b)| a == b)
    }

    /// Tries to parse an uncompressed name present at the start of the
    /// provided buffer. The name need not occupy the entire buffer;
    /// extra data is ignored. If the name is valid, a new `Name` is
    /// returned along with the length of the name in octets.
    pub fn from_wire(octets: &[u8]) -> Result<(Name, usize), Error> {
        let mut n_labels = 0u8;
        let mut pos = 0;
        loop {
            let len = *octets.get(pos).ok_or(Error::UnexpectedEom)? as usize;
            if len > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            }
            n_labels += 1;
            pos += 1;
            if len == 0 {
                break;
            }
            if pos + len > octets.len() {
                return Err(Error::UnexpectedEom);
            }
            pos += len;
            if pos >= MAX_WIRE_LEN {
                // Even a null label will no longer fit.
                return Err(Error::NameTooLong);
            }
        }
        Ok((
            Name {
                n_labels,
                wire: octets[..pos].into(),
            },
            pos,
        ))
    }

    /// Like [`Name::from_wire`], but in addition fails if there is
    /// extra data in the buffer after the name.
    pub fn from_wire_all(octets: &[u8]) -> Result<Name, Error> {
        let (name, len) = Self::from_wire(octets)?;
        if len == octets.len() {
            Ok(name)
        } else {
            Err(Error::ExtraData)
        }
    }
}

impl Index<usize> for Name {
    type Output = Label;

    fn index(&self, index: usize) -> &Self::Output {
        let offset = self.label_offset(index);
        let len = self.wire[offset] as usize;
        Label::from_unchecked(&self.wire[offset + 1..offset + 1 + len])
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() <= 1 {
            f.write_str(".")
        } else {
            for label in self.labels().take(self.len() - 1) {
                write!(f, "{}.", label)?;
            }
            Ok(())
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.labels().zip(other.labels()).all(|(a, b)| a == b)
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The [`Ord`] implementation for `Name` employs DNSSEC's canonical
/// ordering of domain names. Per [RFC 4034 § 6.1], `Name`s are ordered
/// as strings of labels read from right to left.
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels()
            .rev()
            .zip(other.labels().rev())
            .find_map(|(a, b)| Some(a.cmp(b)).filter(|ordering| ordering.is_ne()))
            .unwrap_or_else(|| self.len().cmp(&other.len()))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in self.labels() {
            label.hash(state);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// NAME COMPARISON RESULTS                                            //
////////////////////////////////////////////////////////////////////////

/// The relation between two domain names, as reported by
/// [`Name::compare`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameRelation {
    /// The names are equal (case-insensitively).
    Equal,

    /// The first name is a proper subdomain of the second.
    Subdomain,

    /// The first name is a proper superdomain of the second.
    Superdomain,

    /// Neither name is an ancestor of the other; they share only some
    /// trailing labels (at least the root).
    CommonAncestor,
}

/// The result of [`Name::compare`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NameComparison {
    /// The relation between the compared names.
    pub relation: NameRelation,

    /// The relative ordering of the compared names under the DNSSEC
    /// canonical ordering.
    pub order: Ordering,

    /// The number of trailing labels the compared names share
    /// (including the null label, so always at least one).
    pub common_labels: usize,
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the [`Label`]s in a [`Name`].
///
/// To use this iterator, construct one from a [`Name`] using
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    name: &'a Name,
    offsets: ArrayVec<u8, MAX_N_LABELS>,
    front: usize,
    back: usize,
}

impl Labels<'_> {
    fn new(name: &Name) -> Labels {
        let mut offsets = ArrayVec::new();
        let mut offset = 0;
        for _ in 0..name.len() {
            offsets.push(offset as u8);
            offset += 1 + name.wire[offset] as usize;
        }
        Labels {
            name,
            offsets,
            front: 0,
            back: name.len(),
        }
    }

}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a Label;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let this_one = self.front;
            self.front += 1;
            let offset = self.offsets[this_one] as usize;
            let len = self.name.wire[offset] as usize;
            Some(Label::from_unchecked(
                &self.name.wire[offset + 1..offset + 1 + len],
            ))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<'a> DoubleEndedIterator for Labels<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back > self.front {
            self.back -= 1;
            let offset = self.offsets[self.back] as usize;
            let len = self.name.wire[offset] as usize;
            Some(Label::from_unchecked(
                &self.name.wire[offset + 1..offset + 1 + len],
            ))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Allows for conversion of a Rust [`str`] into a [`Name`]. The passed
/// string must be strictly ASCII. Escape sequences as defined by
/// [RFC 4343 § 2.1] are supported.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Name::root());
        }

        let mut remaining_octets: &[u8] = s.as_ref();
        let mut builder = NameBuilder::new();

        // NOTE: to check that the string is ASCII, it suffices to check
        // that each octet is ASCII as we go. This is because all
        // multi-byte characters start with an octet that is not ASCII.
        while let Some(&octet) = remaining_octets.first() {
            if octet == b'\\' {
                let (value, consumed) = parse_escape(&remaining_octets[1..])?;
                builder.try_push(value)?;
                remaining_octets = &remaining_octets[consumed + 1..];
            } else if octet == b'.' {
                builder.next_label()?;
                remaining_octets = &remaining_octets[1..];
            } else if !octet.is_ascii() {
                return Err(Error::StrNotAscii);
            } else {
                builder.try_push(octet)?;
                remaining_octets = &remaining_octets[1..];
            }
        }
        builder.finish()
    }
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    if remaining_octets.is_empty() {
        Err(Error::InvalidEscape)
    } else if remaining_octets[0].is_ascii_digit() {
        if remaining_octets.len() < 3
            || !remaining_octets[1].is_ascii_digit()
            || !remaining_octets[2].is_ascii_digit()
        {
            Err(Error::InvalidEscape)
        } else {
            let hundreds = (remaining_octets[0] - b'0') as usize;
            let tens = (remaining_octets[1] - b'0') as usize;
            let ones = (remaining_octets[2] - b'0') as usize;
            let value = 100 * hundreds + 10 * tens + ones;
            if value > 255 {
                Err(Error::InvalidEscape)
            } else {
                Ok((value as u8, 3))
            }
        }
    } else {
        Ok((remaining_octets[0], 1))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_expected_characteristics() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.len(), 1);
        assert_eq!(root.wire_repr(), &[0]);
    }

    #[test]
    fn is_wildcard_works() {
        let wildcard: Name = "*.warden.test.".parse().unwrap();
        let not_a_wildcard: Name = "warden.test.".parse().unwrap();
        let inner_asterisk: Name = "x.*.warden.test.".parse().unwrap();
        assert!(wildcard.is_wildcard());
        assert!(!not_a_wildcard.is_wildcard());
        assert!(!inner_asterisk.is_wildcard());
        assert!(Name::wildcard().is_wildcard());
    }

    #[test]
    fn suffix_works() {
        let subdomain: Name = "subdomain.example.test.".parse().unwrap();
        let domain: Name = "example.test.".parse().unwrap();
        let tld: Name = "test.".parse().unwrap();
        assert_eq!(subdomain.suffix(0).as_ref(), Some(&subdomain));
        assert_eq!(subdomain.suffix(1), Some(domain));
        assert_eq!(subdomain.suffix(2), Some(tld));
        assert_eq!(subdomain.suffix(3), Some(Name::root()));
        assert_eq!(subdomain.suffix(4), None);
    }

    #[test]
    fn prefix_works() {
        let name: Name = "a.b.example.test.".parse().unwrap();
        assert_eq!(name.prefix(0), Some(Name::root()));
        assert_eq!(name.prefix(1), Some("a.".parse().unwrap()));
        assert_eq!(name.prefix(2), Some("a.b.".parse().unwrap()));
        assert_eq!(name.prefix(4), None);
    }

    #[test]
    fn concatenate_works() {
        let prefix: Name = "foo.".parse().unwrap();
        let suffix: Name = "target.example.net.".parse().unwrap();
        let combined = prefix.concatenate(&suffix).unwrap();
        assert_eq!(combined, "foo.target.example.net.".parse().unwrap());

        let wildcard = Name::wildcard()
            .concatenate(&"wild.example.com.".parse().unwrap())
            .unwrap();
        assert_eq!(wildcard, "*.wild.example.com.".parse().unwrap());
    }

    #[test]
    fn concatenate_rejects_long_names() {
        let mut long = Name::root();
        let label: Name = format!("{}.", "x".repeat(31)).parse().unwrap();
        for _ in 0..7 {
            long = label.concatenate(&long).unwrap();
        }
        // The wire form is now 225 octets; 32 more will not fit.
        assert_eq!(long.wire_len(), 225);
        assert_eq!(label.concatenate(&long), Err(Error::NameTooLong));
    }

    #[test]
    fn labels_iterator_works() {
        let name: Name = "a.b.example.test.".parse().unwrap();
        let mut labels = name.labels();
        assert_eq!(labels.next(), Some(b"a".as_slice().try_into().unwrap()));
        assert_eq!(labels.next(), Some(b"b".as_slice().try_into().unwrap()));
        assert_eq!(
            labels.next(),
            Some(b"example".as_slice().try_into().unwrap()),
        );
        assert_eq!(labels.next(), Some(b"test".as_slice().try_into().unwrap()));
        assert_eq!(labels.next(), Some(Label::null()));
        assert_eq!(labels.next(), None);
    }

    #[test]
    fn eq_or_subdomain_of_works() {
        let subdomain: Name = "subdomain.example.test.".parse().unwrap();
        let domain: Name = "example.test.".parse().unwrap();
        let other: Name = "other.test.".parse().unwrap();
        let root = Name::root();
        assert!(subdomain.eq_or_subdomain_of(&subdomain));
        assert!(subdomain.eq_or_subdomain_of(&domain));
        assert!(subdomain.eq_or_subdomain_of(&root));
        assert!(!domain.eq_or_subdomain_of(&subdomain));
        assert!(!domain.eq_or_subdomain_of(&other));
        assert!(!root.eq_or_subdomain_of(&domain));
    }

    #[test]
    fn compare_reports_relations() {
        let domain: Name = "example.test.".parse().unwrap();
        let subdomain: Name = "a.b.example.test.".parse().unwrap();
        let sibling: Name = "other.test.".parse().unwrap();
        let unrelated: Name = "example.invalid.".parse().unwrap();

        let comparison = domain.compare(&domain);
        assert_eq!(comparison.relation, NameRelation::Equal);
        assert_eq!(comparison.common_labels, 3);

        let comparison = subdomain.compare(&domain);
        assert_eq!(comparison.relation, NameRelation::Subdomain);
        assert_eq!(comparison.order, Ordering::Greater);
        assert_eq!(comparison.common_labels, 3);

        let comparison = domain.compare(&subdomain);
        assert_eq!(comparison.relation, NameRelation::Superdomain);
        assert_eq!(comparison.order, Ordering::Less);

        let comparison = domain.compare(&sibling);
        assert_eq!(comparison.relation, NameRelation::CommonAncestor);
        assert_eq!(comparison.common_labels, 2);

        let comparison = domain.compare(&unrelated);
        assert_eq!(comparison.relation, NameRelation::CommonAncestor);
        assert_eq!(comparison.common_labels, 1);
    }

    #[test]
    fn ord_works() {
        // This ordered list is from RFC 4034 § 6.1, which defines the
        // canonical ordering of domain names.
        let names: Vec<Name> = [
            "example.",
            "a.example.",
            "yljkjljk.a.example.",
            "Z.a.example.",
            "zABC.a.EXAMPLE.",
            "z.example.",
            "\\001.z.example.",
            "*.z.example.",
            "\\200.z.example.",
        ]
        .into_iter()
        .map(|n| n.parse().unwrap())
        .collect();

        for (i, ni) in names.iter().enumerate() {
            for (j, nj) in names.iter().enumerate() {
                assert_eq!(i.cmp(&j), ni.cmp(nj));
            }
        }
    }

    #[test]
    fn fromstr_works() {
        let name: Name = "example.test.".parse().unwrap();
        assert_eq!(name.wire_repr(), b"\x07example\x04test\x00");
    }

    #[test]
    fn fromstr_works_for_root() {
        let name: Name = ".".parse().unwrap();
        assert_eq!(name, Name::root());
    }

    #[test]
    fn fromstr_rejects_empty() {
        assert_eq!("".parse::<Name>(), Err(Error::StrEmpty));
    }

    #[test]
    fn fromstr_rejects_non_ascii() {
        assert_eq!("✈.aero.".parse::<Name>(), Err(Error::StrNotAscii));
    }

    #[test]
    fn fromstr_rejects_non_fqdn() {
        assert_eq!("non.fqdn".parse::<Name>(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn fromstr_rejects_null_non_terminal() {
        assert_eq!("a.b..c.".parse::<Name>(), Err(Error::NullNonTerminal));
    }

    #[test]
    fn fromstr_escaping_works() {
        let escaped: Name = "\\000.\\\\\\..".parse().unwrap();
        assert_eq!(escaped.wire_repr(), b"\x01\x00\x02\\.\x00");
    }

    #[test]
    fn fromstr_rejects_invalid_escapes() {
        assert_eq!("\\00".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\00x.".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\256.".parse::<Name>(), Err(Error::InvalidEscape));
    }

    #[test]
    fn from_wire_works() {
        let (name, len) = Name::from_wire(b"\x07example\x04test\x00extra").unwrap();
        assert_eq!(name, "example.test.".parse().unwrap());
        assert_eq!(len, 14);
        assert_eq!(
            Name::from_wire_all(b"\x07example\x04test\x00extra"),
            Err(Error::ExtraData),
        );
        assert_eq!(
            Name::from_wire(b"\x07exam"),
            Err(Error::UnexpectedEom),
        );
    }

    #[test]
    fn display_round_trips() {
        for text in ["example.test.", "*.wild.example.com.", "."] {
            let name: Name = text.parse().unwrap();
            assert_eq!(name.to_string(), text);
        }
    }
}

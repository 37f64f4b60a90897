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

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_WIRE_LEN};

/// A facility to efficiently build [`Name`]s.
///
/// The `NameBuilder` constructs the on-the-wire representation of a
/// [`Name`] in a fixed-size internal buffer that is long enough to
/// accommodate any valid name. If the `NameBuilder` is placed on the
/// stack, then construction of a [`Name`] (for instance, when parsing a
/// textual representation) is fast, requiring only one final heap
/// allocation and copy when the name is finished.
///
/// A new `NameBuilder` starts with a single null label. If the build is
/// finished at this point, the name of the DNS root is constructed:
///
/// ```
/// use warden::name::{Name, NameBuilder};
/// assert_eq!(NameBuilder::new().finish().unwrap(), Name::root());
/// ```
///
/// Single octets are added to the current label using
/// [`NameBuilder::try_push`], and slices using
/// [`NameBuilder::try_push_slice`]. A new label is started with
/// [`NameBuilder::next_label`]. If any call would produce an invalid
/// domain name, an error is returned and the builder's state is
/// unchanged.
///
/// Example usage:
///
/// ```
/// use warden::name::{Name, NameBuilder};
/// let mut builder = NameBuilder::new();
/// builder.try_push_slice(b"example").unwrap();
/// builder.next_label().unwrap();
/// builder.try_push_slice(b"test").unwrap();
/// builder.next_label().unwrap(); // start the null label
/// assert_eq!(builder.finish().unwrap(), "example.test.".parse().unwrap());
/// ```
pub struct NameBuilder {
    wire: ArrayVec<u8, MAX_WIRE_LEN>,
    label_start: usize,
    label_len: u8,
    n_labels: u8,
}

impl NameBuilder {
    /// Constructs a new `NameBuilder`, which initially contains a
    /// single null label.
    pub fn new() -> Self {
        let mut wire = ArrayVec::new();
        wire.push(0);
        Self {
            wire,
            label_start: 0,
            label_len: 0,
            n_labels: 0,
        }
    }

    /// Determines whether the name currently stored in the
    /// `NameBuilder` is a fully qualified domain name—that is, whether
    /// it ends with the null label.
    pub fn is_fully_qualified(&self) -> bool {
        self.label_len == 0
    }

    /// Tries to add the given octet to the current label. This will
    /// fail if doing so would make the label or name too long. In the
    /// error case, the `NameBuilder`'s state remains unchanged.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len >= (MAX_LABEL_LEN as u8) {
            Err(Error::LabelTooLong)
        } else if self.wire.try_push(octet).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Tries to add the given slice to the current label. This will
    /// fail if doing so would make the label or name too long. In the
    /// error case, the `NameBuilder`'s state remains unchanged.
    pub fn try_push_slice(&mut self, octets: &[u8]) -> Result<(), Error> {
        if (self.label_len as usize) + octets.len() > MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire.try_extend_from_slice(octets).is_ok() {
            self.label_len += octets.len() as u8;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Finishes the current label and starts a new one. If the current
    /// label is null, this fails, since only the last label in a domain
    /// name may be null. Likewise, if this would make the domain name
    /// too long, this fails. In the error case, the `NameBuilder`'s
    /// state remains unchanged.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.is_fully_qualified() {
            Err(Error::NullNonTerminal)
        } else if self.wire.is_full() {
            Err(Error::NameTooLong)
        } else {
            self.wire[self.label_start] = self.label_len;
            self.label_start = self.wire.len();
            self.label_len = 0;
            self.n_labels += 1;

            // The push will not fail because we checked above that the
            // buffer is not full.
            self.wire.push(0);
            Ok(())
        }
    }

    /// Completes the name under construction. The name must be fully
    /// qualified (end with the null label); otherwise this fails with
    /// [`Error::NonNullTerminal`].
    pub fn finish(self) -> Result<Name, Error> {
        if !self.is_fully_qualified() {
            Err(Error::NonNullTerminal)
        } else {
            Ok(Name::from_wire_unchecked(
                self.wire.as_slice().into(),
                self.n_labels + 1,
            ))
        }
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_root_when_empty() {
        assert_eq!(NameBuilder::new().finish().unwrap(), Name::root());
    }

    #[test]
    fn builder_rejects_unqualified_names() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(b"example").unwrap();
        assert_eq!(builder.finish(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn builder_rejects_null_non_terminals() {
        let mut builder = NameBuilder::new();
        builder.try_push(b'a').unwrap();
        builder.next_label().unwrap();
        assert_eq!(builder.next_label(), Err(Error::NullNonTerminal));
    }

    #[test]
    fn builder_rejects_long_labels() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(&[b'x'; MAX_LABEL_LEN]).unwrap();
        assert_eq!(builder.try_push(b'x'), Err(Error::LabelTooLong));
        assert_eq!(builder.try_push_slice(b"x"), Err(Error::LabelTooLong));
    }

    #[test]
    fn builder_rejects_long_names() {
        let mut builder = NameBuilder::new();
        for _ in 0..126 {
            builder.try_push(b'x').unwrap();
            builder.next_label().unwrap();
        }
        // The wire form is at 253 octets; two more content octets bring
        // it to the 255-octet limit, at which point the name can no
        // longer be terminated.
        builder.try_push(b'x').unwrap();
        builder.try_push(b'x').unwrap();
        assert_eq!(builder.try_push(b'x'), Err(Error::NameTooLong));
        assert_eq!(builder.next_label(), Err(Error::NameTooLong));
    }
}

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

//! Implementation of the [`Error`] type for zone-building errors.

use std::fmt;

/// An error type used to report problems adding records to a zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The record's owner is not within the zone.
    NotInZone,

    /// The record's class does not match the zone's class.
    ClassMismatch,

    /// The record's TTL does not match the other records of its RRset.
    TtlMismatch,

    /// An NSEC3 record's owner is not a valid base32hex-encoded hash
    /// directly under the zone apex.
    BadNsec3Owner,

    /// An NSEC3 or NSEC3PARAM record's RDATA could not be parsed.
    BadNsec3Rdata,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::NotInZone => f.write_str("the record is not within the zone"),
            Self::ClassMismatch => f.write_str("CLASS mismatch"),
            Self::TtlMismatch => f.write_str("TTL mismatch"),
            Self::BadNsec3Owner => {
                f.write_str("the NSEC3 owner is not a hashed name under the apex")
            }
            Self::BadNsec3Rdata => f.write_str("the NSEC3/NSEC3PARAM RDATA is malformed"),
        }
    }
}

impl std::error::Error for Error {}

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

//! Implementation of the [`Type`] type for DNS RR types.

use std::fmt;
use std::str::FromStr;

use crate::util::Caseless;

/// Represents the RR type of a DNS record.
///
/// An RR type is represented on the wire as an unsigned 16-bit integer.
/// Hence this is basically a wrapper around `u16` with nice
/// [`Debug`](fmt::Debug), [`Display`](fmt::Display), and [`FromStr`]
/// implementations for working with the common textual representations
/// of RR types. In addition, constants for common RR types (e.g.
/// [`Type::A`]) are provided.
///
/// The pseudo-type [`Type::ANY`] is valid only in questions; it never
/// appears as the type of a stored RRset.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Type(u16);

impl Type {
    pub const A: Type = Type(1);
    pub const NS: Type = Type(2);
    pub const MD: Type = Type(3);
    pub const MF: Type = Type(4);
    pub const CNAME: Type = Type(5);
    pub const SOA: Type = Type(6);
    pub const MB: Type = Type(7);
    pub const MG: Type = Type(8);
    pub const MR: Type = Type(9);
    pub const NULL: Type = Type(10);
    pub const WKS: Type = Type(11);
    pub const PTR: Type = Type(12);
    pub const HINFO: Type = Type(13);
    pub const MINFO: Type = Type(14);
    pub const MX: Type = Type(15);
    pub const TXT: Type = Type(16);
    pub const AAAA: Type = Type(28);
    pub const SRV: Type = Type(33);
    pub const DNAME: Type = Type(39);
    pub const DS: Type = Type(43);
    pub const RRSIG: Type = Type(46);
    pub const NSEC: Type = Type(47);
    pub const DNSKEY: Type = Type(48);
    pub const NSEC3: Type = Type(50);
    pub const NSEC3PARAM: Type = Type(51);
    pub const ANY: Type = Type(255);
}

impl From<u16> for Type {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Type> for u16 {
    fn from(rr_type: Type) -> Self {
        rr_type.0
    }
}

impl FromStr for Type {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match Caseless(text) {
            Caseless("A") => Ok(Self::A),
            Caseless("NS") => Ok(Self::NS),
            Caseless("MD") => Ok(Self::MD),
            Caseless("MF") => Ok(Self::MF),
            Caseless("CNAME") => Ok(Self::CNAME),
            Caseless("SOA") => Ok(Self::SOA),
            Caseless("MB") => Ok(Self::MB),
            Caseless("MG") => Ok(Self::MG),
            Caseless("MR") => Ok(Self::MR),
            Caseless("NULL") => Ok(Self::NULL),
            Caseless("WKS") => Ok(Self::WKS),
            Caseless("PTR") => Ok(Self::PTR),
            Caseless("HINFO") => Ok(Self::HINFO),
            Caseless("MINFO") => Ok(Self::MINFO),
            Caseless("MX") => Ok(Self::MX),
            Caseless("TXT") => Ok(Self::TXT),
            Caseless("AAAA") => Ok(Self::AAAA),
            Caseless("SRV") => Ok(Self::SRV),
            Caseless("DNAME") => Ok(Self::DNAME),
            Caseless("DS") => Ok(Self::DS),
            Caseless("RRSIG") => Ok(Self::RRSIG),
            Caseless("NSEC") => Ok(Self::NSEC),
            Caseless("DNSKEY") => Ok(Self::DNSKEY),
            Caseless("NSEC3") => Ok(Self::NSEC3),
            Caseless("NSEC3PARAM") => Ok(Self::NSEC3PARAM),
            Caseless("ANY") => Ok(Self::ANY),
            _ => {
                if text
                    .get(0..4)
                    .map_or(false, |prefix| prefix.eq_ignore_ascii_case("TYPE"))
                {
                    text[4..]
                        .parse::<u16>()
                        .map(Self::from)
                        .or(Err("type value is not a valid unsigned 16-bit integer"))
                } else {
                    Err("unknown type")
                }
            }
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::A => f.write_str("A"),
            Self::NS => f.write_str("NS"),
            Self::MD => f.write_str("MD"),
            Self::MF => f.write_str("MF"),
            Self::CNAME => f.write_str("CNAME"),
            Self::SOA => f.write_str("SOA"),
            Self::MB => f.write_str("MB"),
            Self::MG => f.write_str("MG"),
            Self::MR => f.write_str("MR"),
            Self::NULL => f.write_str("NULL"),
            Self::WKS => f.write_str("WKS"),
            Self::PTR => f.write_str("PTR"),
            Self::HINFO => f.write_str("HINFO"),
            Self::MINFO => f.write_str("MINFO"),
            Self::MX => f.write_str("MX"),
            Self::TXT => f.write_str("TXT"),
            Self::AAAA => f.write_str("AAAA"),
            Self::SRV => f.write_str("SRV"),
            Self::DNAME => f.write_str("DNAME"),
            Self::DS => f.write_str("DS"),
            Self::RRSIG => f.write_str("RRSIG"),
            Self::NSEC => f.write_str("NSEC"),
            Self::DNSKEY => f.write_str("DNSKEY"),
            Self::NSEC3 => f.write_str("NSEC3"),
            Self::NSEC3PARAM => f.write_str("NSEC3PARAM"),
            Self::ANY => f.write_str("ANY"),
            Self(value) => write!(f, "TYPE{}", value), // RFC 3597 § 5
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_displays_according_to_rfc3597() {
        // TYPE65280 is from the private use range, so it should always
        // be unknown.
        assert_eq!(Type::from(0xff00).to_string(), "TYPE65280");
        assert_eq!(Type::NSEC3.to_string(), "NSEC3");
    }

    #[test]
    fn type_parses_according_to_rfc3597() {
        let type_a: Type = "TYPE1".parse().unwrap();
        let type_65280: Type = "TYPE65280".parse().unwrap();
        assert_eq!(type_a, Type::A);
        assert_eq!(u16::from(type_65280), 65280);
        assert_eq!("nsec3param".parse(), Ok(Type::NSEC3PARAM));
    }
}

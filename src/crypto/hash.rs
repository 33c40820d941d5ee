// This file is part of QUERCIA.
//
// Copyright (C) 2021 Affidaty Spa.
//
// QUERCIA is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// QUERCIA is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with QUERCIA. If not, see <https://www.gnu.org/licenses/>.

//! Opaque cryptographic secure digest used by the overall project.
//!
//! Current implementation uses SHA-256 and the raw 32 bytes value travels
//! as-is within blocks and messages.

use crate::{Error, ErrorKind, Result};
use ring::digest;
use serde::{de::Visitor, Deserializer, Serializer};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Default)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Construct from a bytes slice holding a previously computed digest.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DIGEST_LEN {
            return Err(Error::new(ErrorKind::MalformedData));
        }
        let mut digest = Digest::default();
        digest.0.copy_from_slice(bytes);
        Ok(digest)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the raw digest bytes as an owned vector.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Compute digest from arbitrary data.
    pub fn from_data(data: &[u8]) -> Self {
        let digest = digest::digest(&digest::SHA256, data);
        let mut value = [0u8; DIGEST_LEN];
        value.copy_from_slice(digest.as_ref());
        Digest(value)
    }

    /// Creates a new instance from a hex string.
    /// Mostly used for testing.
    pub fn from_hex(hex: &str) -> Result<Self> {
        match hex::decode(hex) {
            Ok(buf) => Self::from_bytes(&buf),
            Err(_) => Err(Error::new(ErrorKind::MalformedData)),
        }
    }
}

/// Get a reference to the inner bytes array.
impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl serde::Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.as_bytes())
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DigestVisitor;

        impl<'v> Visitor<'v> for DigestVisitor {
            type Value = Digest;

            fn expecting(
                &self,
                fmt: &mut std::fmt::Formatter<'_>,
            ) -> std::result::Result<(), std::fmt::Error> {
                write!(fmt, "expecting byte array.")
            }

            fn visit_bytes<E>(self, bytes: &[u8]) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Digest::from_bytes(bytes)
                    .map_err(|_err| serde::de::Error::custom("Invalid digest length"))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_bytes(&v)
            }
        }
        deserializer.deserialize_byte_buf(DigestVisitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::base::serialize::{rmp_deserialize, rmp_serialize};

    use super::*;

    // NIST SHA-256 test vectors.
    const EMPTY_DIGEST_HEX: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC_DIGEST_HEX: &str =
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    const DIGEST_SER_HEX: &str =
        "c420ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn digest_empty_data() {
        let digest = Digest::from_data(&[]);

        assert_eq!(hex::encode(digest.as_bytes()), EMPTY_DIGEST_HEX);
    }

    #[test]
    fn digest_known_data() {
        let digest = Digest::from_data(b"abc");

        assert_eq!(hex::encode(digest.as_bytes()), ABC_DIGEST_HEX);
    }

    #[test]
    fn digest_serialize() {
        let digest = Digest::from_hex(ABC_DIGEST_HEX).unwrap();

        let buf = rmp_serialize(&digest).unwrap();

        assert_eq!(hex::encode(&buf), DIGEST_SER_HEX);
    }

    #[test]
    fn digest_deserialize() {
        let expected = Digest::from_hex(ABC_DIGEST_HEX).unwrap();
        let buf = hex::decode(DIGEST_SER_HEX).unwrap();

        let digest: Digest = rmp_deserialize(&buf).unwrap();

        assert_eq!(digest, expected);
    }

    #[test]
    fn digest_from_bytes_bad_length() {
        let result = Digest::from_bytes(&[1, 2, 3]);

        assert_eq!(result.unwrap_err().kind, ErrorKind::MalformedData);
    }
}

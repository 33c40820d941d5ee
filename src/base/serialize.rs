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

use crate::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// Serialize using MessagePack format (without field names).
///
/// # Error
///
/// If the data cannot be serialized a `MalformedData` error kind is returned.
pub fn rmp_serialize<T>(val: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    rmp_serde::to_vec(val).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
}

/// Deserialize using MessagePack format.
///
/// # Error
///
/// If the data cannot be deserialized a `MalformedData` error kind is returned.
pub fn rmp_deserialize<'a, T>(buf: &'a [u8]) -> Result<T>
where
    T: Deserialize<'a>,
{
    rmp_serde::from_slice(buf).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
}

/// Trait implemented by all types that can be serialized with MessagePack format.
pub trait MessagePack<'a>: Sized + Serialize + Deserialize<'a> {
    /// Serialize using MessagePack format.
    ///
    /// # Panics
    ///
    /// Panics if the concrete type cannot be serialized using message pack.
    fn serialize(&self) -> Vec<u8> {
        rmp_serialize(self).unwrap() // Safe for core structs.
    }

    /// Deserialize using MessagePack format.
    ///
    /// # Errors
    ///
    /// Propagates the message pack decoder error.
    fn deserialize(buf: &'a [u8]) -> Result<Self> {
        rmp_deserialize(buf)
    }
}

/// Blanket implementation for types implementing `Serialize` and `Deserialize`.
impl<'a, T: Serialize + Deserialize<'a>> MessagePack<'a> for T {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
    struct TestRecord<'a> {
        height: u64,
        label: &'a str,
        #[serde(with = "serde_bytes")]
        seal: &'a [u8],
        tags: Vec<u8>,
        weights: Vec<u16>,
        notes: BTreeMap<&'a str, u32>,
    }

    impl<'a> TestRecord<'a> {
        fn new() -> Self {
            let mut notes = BTreeMap::new();
            notes.insert("applied", 15);
            notes.insert("orphaned", 10);
            Self {
                height: 42,
                label: "fork-point",
                seal: &[0x0a, 0xff, 0x80],
                tags: vec![0x01, 0xff],
                weights: vec![1, 500, 60],
                notes,
            }
        }
    }

    const RECORD_HEX: &str = "962aaa666f726b2d706f696e74c4030aff809201ccff9301cd01f43c82a76170706c6965640fa86f727068616e65640a";

    #[test]
    fn record_serialize() {
        let record = TestRecord::new();

        let buf = rmp_serialize(&record).unwrap();

        assert_eq!(hex::encode(&buf), RECORD_HEX);
    }

    #[test]
    fn record_deserialize() {
        let exp = TestRecord::new();
        let buf = hex::decode(RECORD_HEX).unwrap();

        let record: TestRecord = rmp_deserialize(&buf).unwrap();

        assert_eq!(record, exp);
    }
}

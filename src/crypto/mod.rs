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

//! Cryptographic primitives: SHA-256 digests, ed25519 keys and the
//! address encoding derived from them.

pub mod ed25519;
pub mod hash;

pub use ed25519::{KeyPair, PublicKey};
pub use hash::{Digest, DIGEST_LEN};

/// Check that a string is a well formed account address.
///
/// An address is the base58 encoding of the SHA-256 digest of the account
/// public key, thus it shall decode to exactly `DIGEST_LEN` bytes.
pub fn is_valid_address(address: &str) -> bool {
    match bs58::decode(address).into_vec() {
        Ok(buf) => buf.len() == DIGEST_LEN,
        Err(_) => false,
    }
}

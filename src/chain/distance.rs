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

//! Fork weight computation.
//!
//! Competing chain segments are compared by their cumulative distance from an
//! "ideal" continuation of the common parent. For every slot the ideal entry
//! is derived from the parent block alone, while the actual entry is perturbed
//! by the generator of the block occupying the slot. The closer the actual
//! entries are to the ideal ones, the better the segment. The accumulated
//! distance is finally divided by the number of distinct generators, favoring
//! segments forged by a wider set of accounts.

use crate::{base::schema::BlockSummaryData, crypto::Digest};
use num_bigint::BigInt;
use std::collections::HashSet;

/// Digest binding a chain slot to the given payload bytes.
fn slot_digest(height: u64, payload: &[u8]) -> Digest {
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&height.to_be_bytes());
    buf.extend_from_slice(payload);
    Digest::from_data(&buf)
}

/// Cumulative distance of a chain segment from the ideal continuation of
/// `parent`. Summaries are expected in chain order. Lower is better.
///
/// An empty segment has zero distance.
pub(crate) fn chain_distance(parent: &BlockSummaryData, summaries: &[BlockSummaryData]) -> BigInt {
    if summaries.is_empty() {
        return BigInt::default();
    }

    let mut distance = BigInt::default();
    let mut generators = HashSet::new();
    let mut parent = parent.clone();
    for summary in summaries {
        let ideal = slot_digest(parent.height, &parent.signature);
        let perturbed = slot_digest(summary.height, &summary.generator_bytes());
        let ideal = BigInt::from_signed_bytes_be(ideal.as_bytes());
        let perturbed = BigInt::from_signed_bytes_be(perturbed.as_bytes());
        let gap = if ideal >= perturbed {
            ideal - perturbed
        } else {
            perturbed - ideal
        };
        distance += gap;

        let address = match &summary.generator {
            Some(public_key) => public_key.to_address(),
            None => String::new(),
        };
        generators.insert(address);
        parent = summary.clone();
    }
    distance / BigInt::from(generators.len() as u64)
}

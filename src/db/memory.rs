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

//! In-memory database implementation.
//!
//! Backs the tests and the light deployments that do not need persistence.
//! A fork clones the whole store, a merge replaces it. The store derives
//! `PartialEq` so two databases can be compared entry by entry, which is
//! how the tests check that orphaning a block restores the state exactly.

use crate::{
    base::schema::{AtStateData, Block, BlockUndo, TransactionData},
    db::{Db, DbFork},
    error::*,
};
use std::collections::{BTreeMap, HashMap};

/// Whole database content.
#[derive(Debug, Clone, PartialEq, Default)]
struct MemoryStore {
    /// Blocks by height.
    blocks: BTreeMap<u64, Block>,
    /// Block height by block signature.
    block_heights: HashMap<Vec<u8>, u64>,
    /// Confirmed transactions by signature.
    transactions: HashMap<Vec<u8>, TransactionData>,
    /// Balances by account address and asset.
    balances: BTreeMap<(String, u64), i64>,
    /// Account last-reference entries.
    last_references: HashMap<String, Vec<u8>>,
    /// Automated transaction states by height.
    at_states: BTreeMap<u64, Vec<AtStateData>>,
    /// Block effects records by block signature.
    undos: HashMap<Vec<u8>, BlockUndo>,
}

impl MemoryStore {
    fn height(&self) -> u64 {
        self.blocks.keys().next_back().copied().unwrap_or(0)
    }

    fn load_block(&self, height: u64) -> Option<Block> {
        self.blocks.get(&height).cloned()
    }

    fn load_block_by_signature(&self, signature: &[u8]) -> Option<Block> {
        self.block_heights
            .get(signature)
            .and_then(|height| self.blocks.get(height))
            .cloned()
    }
}

/// Database implementation keeping the whole state in memory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryDb {
    store: MemoryStore,
}

/// Database writeable snapshot.
/// This structure is obtained via the `fork_create` method and allows to
/// atomically apply a set of changes to the database. In the end the changes
/// shall be merged into the database using the `fork_merge` method, dropping
/// the fork discards them all.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFork {
    store: MemoryStore,
}

impl MemoryDb {
    pub fn new() -> Self {
        MemoryDb::default()
    }
}

impl Db for MemoryDb {
    /// Fork type.
    type DbForkType = MemoryFork;

    fn height(&self) -> u64 {
        self.store.height()
    }

    fn load_block(&self, height: u64) -> Option<Block> {
        self.store.load_block(height)
    }

    fn load_block_by_signature(&self, signature: &[u8]) -> Option<Block> {
        self.store.load_block_by_signature(signature)
    }

    fn contains_transaction(&self, signature: &[u8]) -> bool {
        self.store.transactions.contains_key(signature)
    }

    fn load_balance(&self, address: &str, asset: u64) -> Option<i64> {
        self.store
            .balances
            .get(&(address.to_string(), asset))
            .copied()
    }

    fn load_last_reference(&self, address: &str) -> Option<Vec<u8>> {
        self.store.last_references.get(address).cloned()
    }

    fn fork_create(&mut self) -> MemoryFork {
        MemoryFork {
            store: self.store.clone(),
        }
    }

    fn fork_merge(&mut self, fork: MemoryFork) -> Result<()> {
        self.store = fork.store;
        Ok(())
    }

    fn wipe(&mut self) -> Result<()> {
        self.store = MemoryStore::default();
        Ok(())
    }
}

impl DbFork for MemoryFork {
    fn height(&self) -> u64 {
        self.store.height()
    }

    fn load_block(&self, height: u64) -> Option<Block> {
        self.store.load_block(height)
    }

    fn load_block_by_signature(&self, signature: &[u8]) -> Option<Block> {
        self.store.load_block_by_signature(signature)
    }

    fn load_blocks(&self, first: u64, last: u64) -> Vec<Block> {
        self.store
            .blocks
            .range(first..=last)
            .map(|(_, block)| block.clone())
            .collect()
    }

    fn store_block(&mut self, block: Block) {
        self.store
            .block_heights
            .insert(block.data.signature.clone(), block.data.height);
        self.store.blocks.insert(block.data.height, block);
    }

    fn remove_block(&mut self, height: u64) {
        if let Some(block) = self.store.blocks.remove(&height) {
            self.store.block_heights.remove(&block.data.signature);
        }
    }

    fn contains_transaction(&self, signature: &[u8]) -> bool {
        self.store.transactions.contains_key(signature)
    }

    fn store_transaction(&mut self, tx: TransactionData) {
        self.store.transactions.insert(tx.signature.clone(), tx);
    }

    fn remove_transaction(&mut self, signature: &[u8]) {
        self.store.transactions.remove(signature);
    }

    fn load_balance(&self, address: &str, asset: u64) -> Option<i64> {
        self.store
            .balances
            .get(&(address.to_string(), asset))
            .copied()
    }

    fn store_balance(&mut self, address: &str, asset: u64, value: i64) {
        self.store
            .balances
            .insert((address.to_string(), asset), value);
    }

    fn remove_balance(&mut self, address: &str, asset: u64) {
        self.store.balances.remove(&(address.to_string(), asset));
    }

    fn load_last_reference(&self, address: &str) -> Option<Vec<u8>> {
        self.store.last_references.get(address).cloned()
    }

    fn store_last_reference(&mut self, address: &str, reference: Vec<u8>) {
        self.store
            .last_references
            .insert(address.to_string(), reference);
    }

    fn remove_last_reference(&mut self, address: &str) {
        self.store.last_references.remove(address);
    }

    fn store_at_states(&mut self, height: u64, states: Vec<AtStateData>) {
        self.store.at_states.insert(height, states);
    }

    fn remove_at_states(&mut self, height: u64) {
        self.store.at_states.remove(&height);
    }

    fn load_block_undo(&self, signature: &[u8]) -> Option<BlockUndo> {
        self.store.undos.get(signature).cloned()
    }

    fn store_block_undo(&mut self, signature: &[u8], undo: BlockUndo) {
        self.store.undos.insert(signature.to_vec(), undo);
    }

    fn remove_block_undo(&mut self, signature: &[u8]) {
        self.store.undos.remove(signature);
    }
}

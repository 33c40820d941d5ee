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

//! Chain storage abstraction.
//!
//! Every mutation passes through a fork: an isolated set of uncommitted
//! modifications over the committed state. A fork is merged atomically or
//! dropped without a trace, chain operations rely on this to discard a
//! partially applied synchronization attempt.

use crate::{
    base::schema::{AtStateData, Block, BlockUndo, TransactionData},
    error::*,
};
#[cfg(test)]
use mockall::automock;

pub mod memory;
pub use memory::{MemoryDb, MemoryFork};

/// Trait providing access to the committed chain state.
#[cfg_attr(test, automock(type DbForkType = MockDbFork;))]
pub trait Db: Send + Sync + 'static {
    /// Type representing a database fork.
    type DbForkType: DbFork;

    /// Height of the last committed block, 0 when the chain is empty.
    fn height(&self) -> u64;

    /// Load block at a given `height` (position in the blockchain).
    fn load_block(&self, height: u64) -> Option<Block>;

    /// Load block by its signature.
    fn load_block_by_signature(&self, signature: &[u8]) -> Option<Block>;

    /// Check if a confirmed transaction is present.
    fn contains_transaction(&self, signature: &[u8]) -> bool;

    /// Load a balance entry.
    fn load_balance(&self, address: &str, asset: u64) -> Option<i64>;

    /// Load the signature of the last transaction confirmed for an account.
    fn load_last_reference(&self, address: &str) -> Option<Vec<u8>>;

    /// Create database fork.
    /// A fork is a set of uncommitted modifications to the database.
    fn fork_create(&mut self) -> Self::DbForkType;

    /// Commit modifications contained in a database fork.
    fn fork_merge(&mut self, fork: Self::DbForkType) -> Result<()>;

    /// Drop every stored entry, used to rebuild the chain from scratch.
    fn wipe(&mut self) -> Result<()>;
}

/// Database fork trait.
/// Used to atomically apply a sequence of blocks to the database.
/// Instances of this trait cannot be safely shared between threads.
#[cfg_attr(test, automock)]
pub trait DbFork: 'static {
    /// Height of the last block within the fork, 0 when the chain is empty.
    fn height(&self) -> u64;

    /// Load block at a given `height` (position in the blockchain).
    fn load_block(&self, height: u64) -> Option<Block>;

    /// Load block by its signature.
    fn load_block_by_signature(&self, signature: &[u8]) -> Option<Block>;

    /// Load the blocks between `first` and `last` heights, both included.
    fn load_blocks(&self, first: u64, last: u64) -> Vec<Block>;

    /// Insert block in the blockchain tail.
    fn store_block(&mut self, block: Block);

    /// Remove the block at the given height.
    fn remove_block(&mut self, height: u64);

    /// Check if a confirmed transaction is present.
    fn contains_transaction(&self, signature: &[u8]) -> bool;

    /// Store transaction using its signature as the key.
    fn store_transaction(&mut self, tx: TransactionData);

    /// Remove a confirmed transaction.
    fn remove_transaction(&mut self, signature: &[u8]);

    /// Load a balance entry.
    fn load_balance(&self, address: &str, asset: u64) -> Option<i64>;

    /// Store a balance entry.
    fn store_balance(&mut self, address: &str, asset: u64, value: i64);

    /// Remove a balance entry.
    fn remove_balance(&mut self, address: &str, asset: u64);

    /// Load the signature of the last transaction confirmed for an account.
    fn load_last_reference(&self, address: &str) -> Option<Vec<u8>>;

    /// Store the account last-reference entry.
    fn store_last_reference(&mut self, address: &str, reference: Vec<u8>);

    /// Remove the account last-reference entry.
    fn remove_last_reference(&mut self, address: &str);

    /// Store the automated transaction states produced at the given height.
    fn store_at_states(&mut self, height: u64, states: Vec<AtStateData>);

    /// Remove the automated transaction states produced at the given height.
    fn remove_at_states(&mut self, height: u64);

    /// Load the effects record of a block using the block signature as key.
    fn load_block_undo(&self, signature: &[u8]) -> Option<BlockUndo>;

    /// Store the effects record of a block.
    fn store_block_undo(&mut self, signature: &[u8], undo: BlockUndo);

    /// Remove the effects record of a block.
    fn remove_block_undo(&mut self, signature: &[u8]);
}

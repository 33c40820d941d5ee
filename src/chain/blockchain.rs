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

//! Top level chain bookkeeping.
//!
//! `BlockChain` couples the configuration, the repository and the chain lock.
//! It validates chain well formedness at startup, rebuilds the repository
//! from the configured genesis when it is empty or inconsistent, exposes the
//! forced orphan operation and the fork weight entry point.

use crate::{
    base::{schema::Block, Mutex, RwLock},
    chain::{distance::chain_distance, synchronizer::Synchronizer},
    config::ChainConfig,
    db::{Db, DbFork},
    error::{Error, ErrorKind},
    Result,
};
use num_bigint::BigInt;
use parking_lot::MutexGuard;
use std::sync::Arc;

/// Exclusive right to mutate the local chain.
///
/// At most one execution flow may be changing the chain at any time.
/// Contenders never wait, they give up immediately and retry at the next
/// scheduling tick.
pub struct ChainLock {
    inner: Mutex<()>,
}

impl ChainLock {
    fn new() -> Self {
        ChainLock {
            inner: Mutex::new(()),
        }
    }

    /// Acquire the lock without waiting. `None` when another flow holds it.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, ()>> {
        self.inner.try_lock()
    }
}

/// Chain state shared by the service components.
pub struct BlockChain<D: Db> {
    /// Chain parameters, immutable after startup.
    pub(crate) config: Arc<ChainConfig>,
    /// Blocks and accounts repository.
    pub(crate) db: Arc<RwLock<D>>,
    /// Mutation lock.
    pub(crate) lock: Arc<ChainLock>,
}

impl<D: Db> Clone for BlockChain<D> {
    fn clone(&self) -> Self {
        BlockChain {
            config: self.config.clone(),
            db: self.db.clone(),
            lock: self.lock.clone(),
        }
    }
}

impl<D: Db> BlockChain<D> {
    pub fn new(config: Arc<ChainConfig>, db: Arc<RwLock<D>>) -> Self {
        BlockChain {
            config,
            db,
            lock: Arc::new(ChainLock::new()),
        }
    }

    /// Height of the last block in the chain, 0 when the repository is empty.
    pub fn height(&self) -> u64 {
        self.db.read().height()
    }

    /// Check that the first stored block matches the configured genesis.
    pub fn is_genesis_valid(&self) -> bool {
        let expected = Block::genesis(&self.config);
        match self.db.read().load_block(1) {
            Some(stored) => stored.data.signature == expected.data.signature,
            None => false,
        }
    }

    /// Check chain well formedness at startup.
    ///
    /// A repository that is empty, starts from a different genesis or has a
    /// broken reference link between two consecutive blocks is rebuilt from
    /// scratch. Returns true when the existing chain was kept.
    pub fn validate(&self) -> Result<bool> {
        if self.is_genesis_valid() && self.is_chain_linked() {
            return Ok(true);
        }
        warn!("chain inconsistent with the configured genesis, rebuilding");
        self.rebuild()?;
        Ok(false)
    }

    /// Walk the chain checking that every block references its parent.
    fn is_chain_linked(&self) -> bool {
        let db = self.db.read();
        let height = db.height();
        let mut parent_signature = match db.load_block(1) {
            Some(genesis) => genesis.data.signature,
            None => return false,
        };
        for h in 2..=height {
            match db.load_block(h) {
                Some(block) if block.data.reference == parent_signature => {
                    parent_signature = block.data.signature;
                }
                _ => return false,
            }
        }
        true
    }

    /// Wipe the repository and process the configured genesis block again.
    pub fn rebuild(&self) -> Result<()> {
        let _guard = self
            .lock
            .try_acquire()
            .ok_or_else(|| Error::new_ext(ErrorKind::Other, "chain busy"))?;

        let mut db = self.db.write();
        db.wipe()?;
        let mut fork = db.fork_create();
        let genesis = Block::genesis(&self.config);
        genesis.process(&mut fork, &self.config)?;
        db.fork_merge(fork)?;
        info!("chain rebuilt from the configured genesis");
        Ok(())
    }

    /// Forcibly orphan blocks until the chain is `target` high.
    ///
    /// Every removed block is merged back to the repository one at a time so
    /// that an interruption leaves a consistent shorter chain. The genesis
    /// block is never removed. Returns false without touching anything when
    /// another flow is mutating the chain.
    pub fn orphan_to_height(&self, target: u64) -> Result<bool> {
        let _guard = match self.lock.try_acquire() {
            Some(guard) => guard,
            None => return Ok(false),
        };

        let target = target.max(1);
        let mut db = self.db.write();
        while db.height() > target {
            let height = db.height();
            warn!("forcibly orphaning block at height {}", height);
            let mut fork = db.fork_create();
            let block = fork
                .load_block(height)
                .ok_or_else(|| Error::new_ext(ErrorKind::DatabaseFault, "missing local block"))?;
            block.orphan(&mut fork)?;
            db.fork_merge(fork)?;
        }
        Ok(true)
    }

    /// Weight of the local chain segment starting after `parent_height` up to
    /// `last_height` included. Lower is better.
    pub fn segment_distance(&self, parent_height: u64, last_height: u64) -> Result<BigInt> {
        let db = self.db.read();
        let parent = db
            .load_block(parent_height)
            .ok_or_else(|| Error::new_ext(ErrorKind::ResourceNotFound, "parent block not found"))?;

        let mut summaries = Vec::new();
        for height in (parent_height + 1)..=last_height {
            let block = db
                .load_block(height)
                .ok_or_else(|| Error::new_ext(ErrorKind::ResourceNotFound, "block not found"))?;
            summaries.push(block.summary());
        }
        Ok(chain_distance(&parent.summary(), &summaries))
    }

    /// Synchronizer bound to this chain.
    pub fn synchronizer(&self) -> Synchronizer<D> {
        Synchronizer::new(self.clone())
    }
}

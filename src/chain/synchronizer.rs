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

//! Chain synchronization with a remote peer.
//!
//! A synchronization round runs in three phases:
//!
//! 1. Probe the peer for the most recent block shared by both chains,
//!    walking back from the local tip with a growing step.
//! 2. When the peer chain forks away before the local tip, compare the
//!    contested suffixes by segment distance and keep the better one.
//! 3. Orphan the local blocks above the common ancestor and apply the peer
//!    blocks on a fork of the state, committing only if every block checks
//!    out. On any trouble the fork is dropped and the local chain stays
//!    exactly as it was.
//!
//! Every round adopts a bounded number of blocks, a node that lags far
//! behind catches up over repeated rounds.

use crate::{
    base::schema::{Block, BlockSummaryData},
    chain::{
        blockchain::BlockChain,
        distance::chain_distance,
        message::{Message, PROTOCOL_VERSION},
        peer::PeerLink,
        transaction::ValidationResult,
    },
    db::{Db, DbFork},
    error::{Error, ErrorKind, Result},
};
use serde_bytes::ByteBuf;

/// First backward step of the common ancestor probe.
const INITIAL_BLOCK_STEP: u64 = 8;
/// Largest backward probe step and largest batch requested from a peer.
pub(crate) const MAXIMUM_BLOCK_STEP: u64 = 500;
/// Largest accepted gap between the local tip and the common ancestor.
const MAXIMUM_HEIGHT_DELTA: u64 = 60;
/// Blocks adopted from the peer within a single round.
const SYNC_BATCH_SIZE: u64 = 200;

/// Outcome of a synchronization round.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SyncStatus {
    /// Another chain activity holds the chain lock, nothing was done.
    Busy,
    /// The peer chain is empty or contains only the genesis block.
    PeerIdle,
    /// The local chain is at least as good as the peer one.
    ChainKept,
    /// Blocks were adopted from the peer, the local chain is now at `height`.
    Synchronized { height: u64 },
    /// The round was given up, the local chain is unchanged.
    Aborted(SyncFault),
}

/// Reason for giving up a synchronization round.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SyncFault {
    /// The peer chain shares no block with ours, not even the genesis.
    NoCommonBlock,
    /// The common ancestor is too far behind the local tip.
    TooDivergent { common_height: u64 },
    /// The peer did not provide the summaries of its contested suffix.
    MissingSummaries { height: u64 },
    /// The peer did not provide the signatures of the blocks to adopt.
    MissingSignatures { height: u64 },
    /// The peer announced a block but did not provide it.
    MissingBlock { height: u64 },
    /// A peer block carries a bad generator signature.
    InvalidBlockSignature { height: u64 },
    /// A peer block does not pass validation against the forked state.
    InvalidBlock { height: u64, reason: ValidationResult },
}

/// Chain synchronization driver.
pub struct Synchronizer<D: Db> {
    chain: BlockChain<D>,
}

fn abort(fault: SyncFault) -> Result<SyncStatus> {
    info!("synchronization aborted: {:?}", fault);
    Ok(SyncStatus::Aborted(fault))
}

fn request_signatures(peer: &dyn PeerLink, parent: &[u8]) -> Option<Vec<ByteBuf>> {
    match peer.exchange(Message::GetSignaturesRequest {
        parent: parent.to_vec(),
    }) {
        Some(Message::GetSignaturesResponse { signatures }) => Some(signatures),
        _ => None,
    }
}

fn request_summaries(
    peer: &dyn PeerLink,
    parent: &[u8],
    count: u64,
) -> Option<Vec<BlockSummaryData>> {
    match peer.exchange(Message::GetBlockSummariesRequest {
        parent: parent.to_vec(),
        count,
    }) {
        Some(Message::GetBlockSummariesResponse { summaries }) => Some(summaries),
        _ => None,
    }
}

fn request_block(peer: &dyn PeerLink, signature: &[u8]) -> Option<Block> {
    match peer.exchange(Message::GetBlockRequest {
        signature: signature.to_vec(),
    }) {
        Some(Message::GetBlockResponse { block }) => Some(block),
        _ => None,
    }
}

/// Best effort collection of `required` summaries following the common
/// block. Batches are requested with an advancing cursor, the collection
/// stops short at the first batch the peer fails to provide.
fn collect_peer_summaries(
    peer: &dyn PeerLink,
    common_signature: &[u8],
    required: u64,
) -> Vec<BlockSummaryData> {
    let mut summaries: Vec<BlockSummaryData> = Vec::new();
    let mut cursor = common_signature.to_vec();
    while (summaries.len() as u64) < required {
        let count = (required - summaries.len() as u64).min(MAXIMUM_BLOCK_STEP);
        let batch = match request_summaries(peer, &cursor, count) {
            Some(batch) if !batch.is_empty() => batch,
            _ => break,
        };
        cursor = match batch.last() {
            Some(summary) => summary.signature.clone(),
            None => break,
        };
        summaries.extend(batch);
    }
    summaries.truncate(required as usize);
    summaries
}

impl<D: Db> Synchronizer<D> {
    pub fn new(chain: BlockChain<D>) -> Self {
        Synchronizer { chain }
    }

    /// Run one synchronization round against `peer`.
    ///
    /// Expected outcomes, peer misbehavior included, are reported within
    /// `SyncStatus`. An `Err` is returned only on local store faults.
    pub fn synchronize(&self, peer: &dyn PeerLink) -> Result<SyncStatus> {
        let _guard = match self.chain.lock.try_acquire() {
            Some(guard) => guard,
            None => return Ok(SyncStatus::Busy),
        };
        let peer_height = peer.height();
        if peer_height <= 1 {
            return Ok(SyncStatus::PeerIdle);
        }
        let our_height = self.chain.height();
        if our_height == 0 {
            return Err(Error::new_ext(
                ErrorKind::DatabaseFault,
                "chain not initialized",
            ));
        }
        debug!("synchronizing with peer at height {}", peer_height);

        let common_height = self.find_common_height(peer)?;
        debug!("common ancestor at height {}", common_height);
        // Covers peers reporting a height below the blocks they serve.
        if common_height >= peer_height {
            return Ok(SyncStatus::ChainKept);
        }
        if common_height < our_height.saturating_sub(MAXIMUM_HEIGHT_DELTA) {
            return abort(SyncFault::TooDivergent { common_height });
        }

        if common_height < our_height {
            // Contested suffixes, the mutual overlap decides by distance.
            let required = our_height.min(peer_height) - common_height;
            let common_block = self
                .chain
                .db
                .read()
                .load_block(common_height)
                .ok_or_else(|| Error::new_ext(ErrorKind::DatabaseFault, "missing local block"))?;
            let peer_summaries =
                collect_peer_summaries(peer, &common_block.data.signature, required);
            if (peer_summaries.len() as u64) < required {
                let fault = if peer_summaries.is_empty() && common_height == 1 {
                    SyncFault::NoCommonBlock
                } else {
                    SyncFault::MissingSummaries {
                        height: common_height + peer_summaries.len() as u64 + 1,
                    }
                };
                return abort(fault);
            }
            let ours = self
                .chain
                .segment_distance(common_height, common_height + required)?;
            let theirs = chain_distance(&common_block.summary(), &peer_summaries);
            if ours <= theirs {
                debug!("local fork wins by distance, {} <= {}", ours, theirs);
                return Ok(SyncStatus::ChainKept);
            }
        }

        self.adopt(peer, common_height, peer_height)
    }

    /// Walk back from the local tip until the peer recognizes one of our
    /// block signatures, then take the most recent entry of its reply that
    /// is also part of the local chain.
    fn find_common_height(&self, peer: &dyn PeerLink) -> Result<u64> {
        let missing_block =
            || Error::new_ext(ErrorKind::DatabaseFault, "missing local block");
        let db = self.chain.db.read();
        let mut probe_height = db.height();
        let mut probe = db
            .load_block(probe_height)
            .ok_or_else(missing_block)?
            .data
            .signature;
        let growing = peer.version() >= PROTOCOL_VERSION;
        let mut step = if growing {
            INITIAL_BLOCK_STEP
        } else {
            MAXIMUM_BLOCK_STEP
        };

        let mut headers = request_signatures(peer, &probe).unwrap_or_default();
        while headers.is_empty() && probe_height > 1 {
            probe_height = probe_height.saturating_sub(step).max(1);
            probe = db
                .load_block(probe_height)
                .ok_or_else(missing_block)?
                .data
                .signature;
            headers = request_signatures(peer, &probe).unwrap_or_default();
            if growing {
                step = (step * 2).min(MAXIMUM_BLOCK_STEP);
            }
        }

        for signature in headers.iter().rev() {
            if let Some(block) = db.load_block_by_signature(signature) {
                return Ok(block.data.height);
            }
        }
        Ok(probe_height)
    }

    /// Orphan the local blocks above the common ancestor and apply the peer
    /// blocks on a state fork. The fork is merged only when every block has
    /// been fetched, verified and processed.
    fn adopt(
        &self,
        peer: &dyn PeerLink,
        common_height: u64,
        peer_height: u64,
    ) -> Result<SyncStatus> {
        let mut fork = self.chain.db.write().fork_create();
        let our_height = fork.height();
        if our_height > common_height {
            info!(
                "discarding {} local blocks above height {}",
                our_height - common_height,
                common_height
            );
        }
        for height in (common_height + 1..=our_height).rev() {
            let block = fork
                .load_block(height)
                .ok_or_else(|| Error::new_ext(ErrorKind::DatabaseFault, "missing local block"))?;
            block.orphan(&mut fork)?;
        }

        let mut cursor = fork
            .load_block(common_height)
            .ok_or_else(|| Error::new_ext(ErrorKind::DatabaseFault, "missing local block"))?
            .data
            .signature;
        let limit = peer_height.min(common_height + SYNC_BATCH_SIZE);
        let mut height = common_height;
        while height < limit {
            let batch = match request_signatures(peer, &cursor) {
                Some(batch) if !batch.is_empty() => batch,
                _ => return abort(SyncFault::MissingSignatures { height: height + 1 }),
            };
            for signature in batch {
                let block = match request_block(peer, &signature) {
                    Some(block) => block,
                    None => return abort(SyncFault::MissingBlock { height: height + 1 }),
                };
                if !block.is_signature_valid() {
                    return abort(SyncFault::InvalidBlockSignature { height: height + 1 });
                }
                let result = block.is_valid(&mut fork, &self.chain.config);
                if result != ValidationResult::Ok {
                    return abort(SyncFault::InvalidBlock {
                        height: height + 1,
                        reason: result,
                    });
                }
                block.process(&mut fork, &self.chain.config)?;
                cursor = block.data.signature.clone();
                height += 1;
                if height == limit {
                    break;
                }
            }
        }

        self.chain.db.write().fork_merge(fork)?;
        info!("chain synchronized with peer, height {}", height);
        Ok(SyncStatus::Synchronized { height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::{
            schema::{tests::create_test_keypair, BlockData},
            RwLock,
        },
        chain::{
            block::tests::{forge_block, forge_payment},
            blockchain::tests::{create_test_chain, push_test_block},
            dispatcher::Dispatcher,
            peer::MockPeerLink,
        },
        config::tests::create_test_config,
        db::MemoryDb,
    };
    use std::sync::Arc;

    /// Peer backed by another in-memory chain, answering through its
    /// dispatcher.
    struct TestPeer {
        chain: BlockChain<MemoryDb>,
        dispatcher: Dispatcher<MemoryDb>,
        claimed_height: Option<u64>,
    }

    impl TestPeer {
        fn new(chain: &BlockChain<MemoryDb>) -> Self {
            TestPeer {
                chain: chain.clone(),
                dispatcher: Dispatcher::new(chain.clone()),
                claimed_height: None,
            }
        }
    }

    impl PeerLink for TestPeer {
        fn height(&self) -> u64 {
            self.claimed_height.unwrap_or_else(|| self.chain.height())
        }

        fn version(&self) -> u32 {
            PROTOCOL_VERSION
        }

        fn exchange(&self, request: Message) -> Option<Message> {
            self.dispatcher.message(request)
        }
    }

    /// Peer hiding one block from its chain.
    struct BlocklessPeer {
        inner: TestPeer,
        missing: Vec<u8>,
    }

    impl PeerLink for BlocklessPeer {
        fn height(&self) -> u64 {
            self.inner.height()
        }

        fn version(&self) -> u32 {
            self.inner.version()
        }

        fn exchange(&self, request: Message) -> Option<Message> {
            match &request {
                Message::GetBlockRequest { signature } if *signature == self.missing => None,
                _ => self.inner.exchange(request),
            }
        }
    }

    fn create_chain_with_height(height: u64) -> BlockChain<MemoryDb> {
        let chain = create_test_chain();
        for _ in 1..height {
            push_test_block(&chain);
        }
        chain
    }

    /// Extend the chain with payment blocks whose content depends on the
    /// given generator and amount, forks built with different arguments
    /// diverge.
    fn extend_chain(chain: &BlockChain<MemoryDb>, blocks: u64, generator_index: usize, amount: i64) {
        for _ in 0..blocks {
            let mut db = chain.db.write();
            let mut fork = db.fork_create();
            let sender = create_test_keypair(1);
            let recipient = create_test_keypair(2).public_key().to_address();
            let parent_timestamp = fork.load_block(fork.height()).unwrap().data.timestamp;
            let tx = forge_payment(&fork, &sender, recipient, amount, 10, parent_timestamp + 1_000);
            let block = forge_block(&fork, &create_test_keypair(generator_index), vec![tx]);
            block.process(&mut fork, &chain.config).unwrap();
            db.fork_merge(fork).unwrap();
        }
    }

    fn clone_chain(chain: &BlockChain<MemoryDb>) -> BlockChain<MemoryDb> {
        let db = chain.db.read().clone();
        BlockChain::new(chain.config.clone(), Arc::new(RwLock::new(db)))
    }

    #[test]
    fn busy_when_chain_is_locked() {
        let chain = create_test_chain();
        let peer = MockPeerLink::new();
        let _guard = chain.lock.try_acquire().unwrap();

        let status = chain.synchronizer().synchronize(&peer).unwrap();

        assert_eq!(status, SyncStatus::Busy);
    }

    #[test]
    fn idle_peer_is_ignored() {
        let chain = create_chain_with_height(3);
        let mut peer = MockPeerLink::new();
        peer.expect_height().return_const(1u64);

        let status = chain.synchronizer().synchronize(&peer).unwrap();

        assert_eq!(status, SyncStatus::PeerIdle);
    }

    #[test]
    fn identical_chains_are_kept() {
        let local = create_chain_with_height(5);
        let remote = create_chain_with_height(5);
        let snapshot = local.db.read().clone();

        let status = local
            .synchronizer()
            .synchronize(&TestPeer::new(&remote))
            .unwrap();

        assert_eq!(status, SyncStatus::ChainKept);
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn peer_chain_extension_is_adopted() {
        let local = create_chain_with_height(3);
        let remote = create_chain_with_height(8);

        let status = local
            .synchronizer()
            .synchronize(&TestPeer::new(&remote))
            .unwrap();

        assert_eq!(status, SyncStatus::Synchronized { height: 8 });
        assert_eq!(*local.db.read(), *remote.db.read());
    }

    #[test]
    fn contested_fork_resolved_by_distance() {
        // Forks diverging at height 20, reaching heights 30 and 35. The
        // mutual overlap compared by distance spans heights 21 to 30.
        let chain_a = create_chain_with_height(20);
        extend_chain(&chain_a, 10, 0, 500);
        let chain_b = create_chain_with_height(20);
        extend_chain(&chain_b, 15, 3, 600);
        let distance_a = chain_a.segment_distance(20, 30).unwrap();
        let distance_b = chain_b.segment_distance(20, 30).unwrap();
        let (winner, loser) = if distance_a <= distance_b {
            (chain_a, chain_b)
        } else {
            (chain_b, chain_a)
        };
        let winner_height = winner.height();
        let winner_copy = clone_chain(&winner);
        let loser_copy = clone_chain(&loser);

        // The chain holding the worse fork adopts the better one in full.
        let status = loser
            .synchronizer()
            .synchronize(&TestPeer::new(&winner))
            .unwrap();
        assert_eq!(
            status,
            SyncStatus::Synchronized {
                height: winner_height
            }
        );
        assert_eq!(*loser.db.read(), *winner.db.read());

        // The chain holding the better fork keeps it.
        let status = winner_copy
            .synchronizer()
            .synchronize(&TestPeer::new(&loser_copy))
            .unwrap();
        assert_eq!(status, SyncStatus::ChainKept);
        assert_eq!(winner_copy.height(), winner_height);
    }

    #[test]
    fn equal_distance_keeps_the_local_chain() {
        // The peer presents our own blocks 6 to 8 as its contested suffix,
        // so both distances come out identical and the tie favors us.
        let local = create_chain_with_height(8);
        let mut headers: Vec<ByteBuf> = vec![ByteBuf::from(
            local.db.read().load_block(5).unwrap().data.signature.clone(),
        )];
        headers.extend((7u8..10).map(|byte| ByteBuf::from(vec![byte; 64])));
        let summaries: Vec<BlockSummaryData> = (6..=8)
            .map(|height| local.db.read().load_block(height).unwrap().summary())
            .collect();
        let snapshot = local.db.read().clone();

        let mut peer = MockPeerLink::new();
        peer.expect_height().return_const(8u64);
        peer.expect_version().return_const(PROTOCOL_VERSION);
        peer.expect_exchange().returning(move |request| match request {
            Message::GetSignaturesRequest { .. } => Some(Message::GetSignaturesResponse {
                signatures: headers.clone(),
            }),
            Message::GetBlockSummariesRequest { .. } => {
                Some(Message::GetBlockSummariesResponse {
                    summaries: summaries.clone(),
                })
            }
            _ => None,
        });

        let status = local.synchronizer().synchronize(&peer).unwrap();

        assert_eq!(status, SyncStatus::ChainKept);
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn adoption_is_bounded_per_round() {
        let local = create_test_chain();
        let remote = create_chain_with_height(210);
        let peer = TestPeer::new(&remote);

        let status = local.synchronizer().synchronize(&peer).unwrap();
        assert_eq!(status, SyncStatus::Synchronized { height: 201 });
        assert_eq!(local.height(), 201);

        let status = local.synchronizer().synchronize(&peer).unwrap();
        assert_eq!(status, SyncStatus::Synchronized { height: 210 });
        assert_eq!(*local.db.read(), *remote.db.read());
    }

    #[test]
    fn missing_block_aborts_without_changes() {
        let local = create_chain_with_height(3);
        let remote = create_chain_with_height(8);
        let missing = remote.db.read().load_block(6).unwrap().data.signature;
        let peer = BlocklessPeer {
            inner: TestPeer::new(&remote),
            missing,
        };
        let snapshot = local.db.read().clone();

        let status = local.synchronizer().synchronize(&peer).unwrap();

        assert_eq!(
            status,
            SyncStatus::Aborted(SyncFault::MissingBlock { height: 6 })
        );
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn overstated_peer_height_aborts_without_changes() {
        let local = create_chain_with_height(3);
        let remote = create_chain_with_height(8);
        let mut peer = TestPeer::new(&remote);
        peer.claimed_height = Some(105);
        let snapshot = local.db.read().clone();

        let status = local.synchronizer().synchronize(&peer).unwrap();

        assert_eq!(
            status,
            SyncStatus::Aborted(SyncFault::MissingSignatures { height: 9 })
        );
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn understated_peer_height_keeps_the_chain() {
        // The peer serves our identical chain while reporting a height far
        // below its tip, nothing is adopted and nothing is committed.
        let local = create_chain_with_height(8);
        let remote = create_chain_with_height(8);
        let mut peer = TestPeer::new(&remote);
        peer.claimed_height = Some(3);
        let snapshot = local.db.read().clone();

        let status = local.synchronizer().synchronize(&peer).unwrap();

        assert_eq!(status, SyncStatus::ChainKept);
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn invalid_block_aborts_without_changes() {
        let local = create_chain_with_height(3);
        let remote = create_chain_with_height(3);
        let generator = create_test_keypair(0);
        {
            // Store a block whose declared fees do not match its content.
            let mut db = remote.db.write();
            let mut fork = db.fork_create();
            let sender = create_test_keypair(1);
            let recipient = create_test_keypair(2).public_key().to_address();
            let parent = fork.load_block(3).unwrap();
            let tx = forge_payment(
                &fork,
                &sender,
                recipient,
                500,
                10,
                parent.data.timestamp + 1_000,
            );
            let mut data = BlockData::new(
                4,
                parent.data.signature.clone(),
                parent.data.timestamp + 60_000,
                Some(generator.public_key()),
                parent.data.generating_balance,
            );
            data.total_fees = 999;
            data.transaction_count = 1;
            data.sign(&generator).unwrap();
            fork.store_block(Block::new(data, vec![tx], vec![]));
            db.fork_merge(fork).unwrap();
        }
        let snapshot = local.db.read().clone();

        let status = local
            .synchronizer()
            .synchronize(&TestPeer::new(&remote))
            .unwrap();

        assert_eq!(
            status,
            SyncStatus::Aborted(SyncFault::InvalidBlock {
                height: 4,
                reason: ValidationResult::InvalidFees,
            })
        );
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn peer_with_unrelated_chain_is_rejected() {
        let local = create_chain_with_height(3);
        let mut config = create_test_config();
        config.genesis_info.timestamp += 1;
        let remote = BlockChain::new(
            Arc::new(config),
            Arc::new(RwLock::new(MemoryDb::new())),
        );
        remote.validate().unwrap();
        extend_chain(&remote, 2, 0, 500);
        let snapshot = local.db.read().clone();

        let status = local
            .synchronizer()
            .synchronize(&TestPeer::new(&remote))
            .unwrap();

        assert_eq!(status, SyncStatus::Aborted(SyncFault::NoCommonBlock));
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn too_divergent_fork_is_rejected() {
        let local = create_chain_with_height(65);
        let remote = create_test_chain();
        extend_chain(&remote, 66, 3, 600);
        let snapshot = local.db.read().clone();

        let status = local
            .synchronizer()
            .synchronize(&TestPeer::new(&remote))
            .unwrap();

        assert_eq!(
            status,
            SyncStatus::Aborted(SyncFault::TooDivergent { common_height: 1 })
        );
        assert_eq!(*local.db.read(), snapshot);
    }

    #[test]
    fn genesis_fallback_resolves_by_distance() {
        let local = create_test_chain();
        extend_chain(&local, 2, 3, 777);
        let remote = create_chain_with_height(6);
        let genesis = local.db.read().load_block(1).unwrap();
        let peer_summaries: Vec<BlockSummaryData> = (2..=3)
            .map(|height| remote.db.read().load_block(height).unwrap().summary())
            .collect();
        let ours = local.segment_distance(1, 3).unwrap();
        let theirs = chain_distance(&genesis.summary(), &peer_summaries);

        let status = local
            .synchronizer()
            .synchronize(&TestPeer::new(&remote))
            .unwrap();

        if ours <= theirs {
            assert_eq!(status, SyncStatus::ChainKept);
            assert_eq!(local.height(), 3);
        } else {
            assert_eq!(status, SyncStatus::Synchronized { height: 6 });
            assert_eq!(*local.db.read(), *remote.db.read());
        }
    }

    #[test]
    fn missing_local_block_during_probe_fails() {
        let local = create_chain_with_height(10);
        {
            let mut db = local.db.write();
            let mut fork = db.fork_create();
            fork.remove_block(2);
            db.fork_merge(fork).unwrap();
        }
        let mut peer = MockPeerLink::new();
        peer.expect_height().return_const(20u64);
        peer.expect_version().return_const(PROTOCOL_VERSION);
        peer.expect_exchange()
            .returning(|_| Some(Message::GetSignaturesResponse { signatures: vec![] }));

        let err = local.synchronizer().synchronize(&peer).unwrap_err();

        assert_eq!(err.kind, ErrorKind::DatabaseFault);
    }
}

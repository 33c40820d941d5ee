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

//! Block validation and state transition.
//!
//! A block received from a peer goes through `is_signature_valid`, `is_valid`
//! and `process`, always on top of a database fork. During a reorganization
//! `orphan` reverses the newest block using the undo record stored when it
//! was processed. The genesis block is not validated this way, it is rebuilt
//! from the configuration and compared by signature.

use crate::{
    base::schema::{
        BalanceUndo, Block, BlockData, BlockUndo, TransactionData, TransactionPayload, TxUndo,
        ASSET_NATIVE, SIGNATURE_LEN,
    },
    chain::transaction::ValidationResult,
    config::ChainConfig,
    crypto::DIGEST_LEN,
    db::DbFork,
    error::{Error, ErrorKind},
    Result,
};

impl Block {
    /// Build the genesis block from the configuration.
    ///
    /// The block is fully deterministic, every node constructs the very same
    /// bytes from the same configuration.
    pub fn genesis(config: &ChainConfig) -> Block {
        let genesis = &config.genesis_info;

        let transactions: Vec<TransactionData> = genesis
            .allocations
            .iter()
            .map(|allocation| {
                let mut tx = TransactionData::new(
                    None,
                    0,
                    genesis.timestamp,
                    vec![],
                    TransactionPayload::Genesis {
                        recipient: allocation.recipient.clone(),
                        amount: allocation.amount,
                    },
                );
                tx.signature = tx.genesis_signature();
                tx
            })
            .collect();

        let mut data = BlockData::new(
            1,
            vec![0; SIGNATURE_LEN],
            genesis.timestamp,
            None,
            genesis.generating_balance,
        );
        data.transaction_count = transactions.len() as u32;
        data.signature = data.genesis_signature();

        Block::new(data, transactions, vec![])
    }

    /// Check the header signature.
    ///
    /// Blocks without a generator are genesis style, their pseudo signature
    /// is compared against the recomputed one.
    pub fn is_signature_valid(&self) -> bool {
        match &self.data.generator {
            None => self.data.signature == self.data.genesis_signature(),
            Some(generator) => generator.verify(&self.data.signable_bytes(), &self.data.signature),
        }
    }

    /// Check the block against the fork state.
    ///
    /// Contained transactions are applied to the fork while checking so that
    /// later entries see the effects of earlier ones, every applied effect is
    /// reverted before returning. The fork content is unchanged on return.
    pub fn is_valid<F: DbFork>(&self, fork: &mut F, config: &ChainConfig) -> ValidationResult {
        // The block must extend the current tip.
        let parent = match fork.load_block(fork.height()) {
            Some(parent) => parent,
            None => return ValidationResult::InvalidReference,
        };
        if self.data.reference != parent.data.signature
            || self.data.height != parent.data.height + 1
        {
            return ValidationResult::InvalidReference;
        }

        // Strictly after the parent, not too close to it, not too far from it.
        let min_gap = config.min_block_time * 1000;
        let max_gap = config.max_block_time * 1000;
        let margin = config.block_timestamp_margin;
        let gap = self.data.timestamp.saturating_sub(parent.data.timestamp);
        if gap == 0
            || gap < min_gap.saturating_sub(margin)
            || gap > max_gap.saturating_add(margin)
        {
            return ValidationResult::InvalidTimestamp;
        }

        let generator = match &self.data.generator {
            Some(generator) => generator,
            None => return ValidationResult::InvalidGenerator,
        };
        // The staked balance is inherited from the parent and recomputed from
        // the generator account at every difficulty interval boundary.
        let expected_balance = if parent.data.height % config.block_difficulty_interval == 0 {
            fork.load_balance(&generator.to_address(), ASSET_NATIVE)
                .unwrap_or(0)
        } else {
            parent.data.generating_balance
        };
        if self.data.generating_balance != expected_balance {
            return ValidationResult::InvalidGenerator;
        }

        let mut undos: Vec<TxUndo> = Vec::with_capacity(self.transactions.len());
        let mut result = ValidationResult::Ok;
        for tx in &self.transactions {
            if tx.creator.is_none() || matches!(tx.payload, TransactionPayload::Genesis { .. }) {
                result = ValidationResult::InvalidGenesis;
                break;
            }
            if !tx.is_signature_valid() {
                result = ValidationResult::InvalidSignature;
                break;
            }
            if tx.timestamp > self.data.timestamp || tx.deadline() <= self.data.timestamp {
                result = ValidationResult::InvalidTransactionTimestamp;
                break;
            }
            let tx_result = tx.validate(fork, config);
            if tx_result != ValidationResult::Ok {
                result = tx_result;
                break;
            }
            match tx.process(fork) {
                Ok(undo) => undos.push(undo),
                Err(_) => {
                    result = ValidationResult::InvalidGenesis;
                    break;
                }
            }
        }
        for (tx, undo) in self.transactions.iter().zip(undos.iter()).rev() {
            tx.orphan(fork, undo);
        }
        if result != ValidationResult::Ok {
            return result;
        }

        let fees: i64 = self.transactions.iter().map(|tx| tx.fee).sum();
        if self.data.total_fees != fees
            || self.data.transaction_count != self.transactions.len() as u32
        {
            return ValidationResult::InvalidFees;
        }

        if !self.at_states.is_empty() {
            if self.data.height < config.at_release_height() {
                return ValidationResult::InvalidAtState;
            }
            for state in &self.at_states {
                if state.address.is_empty()
                    || state.state_hash.len() != DIGEST_LEN
                    || state.fees < 0
                {
                    return ValidationResult::InvalidAtState;
                }
            }
        }

        ValidationResult::Ok
    }

    /// Apply the block effects to the fork.
    ///
    /// The undo record covering every touched entry is stored alongside the
    /// block so that [orphan](Self::orphan) can reverse it later.
    pub fn process<F: DbFork>(&self, fork: &mut F, config: &ChainConfig) -> Result<()> {
        let mut undo = BlockUndo::default();

        for tx in &self.transactions {
            undo.txs.push(tx.process(fork)?);
        }

        if !self.at_states.is_empty() {
            fork.store_at_states(self.data.height, self.at_states.clone());
        }

        if let Some(generator) = &self.data.generator {
            let address = generator.to_address();
            let earned = self.data.total_fees + config.reward_at_height(self.data.height);
            if earned != 0 {
                let balance = fork.load_balance(&address, ASSET_NATIVE);
                undo.balances.push(BalanceUndo {
                    address: address.clone(),
                    asset: ASSET_NATIVE,
                    prev: balance,
                });
                fork.store_balance(&address, ASSET_NATIVE, balance.unwrap_or(0) + earned);
            }
        }

        fork.store_block_undo(&self.data.signature, undo);
        fork.store_block(self.clone());
        Ok(())
    }

    /// Revert the block effects using the stored undo record.
    ///
    /// A missing or inconsistent undo record means the repository cannot be
    /// rolled back and is reported as a database fault.
    pub fn orphan<F: DbFork>(&self, fork: &mut F) -> Result<()> {
        let undo = fork
            .load_block_undo(&self.data.signature)
            .ok_or_else(|| Error::new_ext(ErrorKind::DatabaseFault, "missing block undo record"))?;
        if undo.txs.len() != self.transactions.len() {
            return Err(Error::new_ext(
                ErrorKind::DatabaseFault,
                "inconsistent block undo record",
            ));
        }

        for balance in undo.balances.iter().rev() {
            match balance.prev {
                Some(prev) => fork.store_balance(&balance.address, balance.asset, prev),
                None => fork.remove_balance(&balance.address, balance.asset),
            }
        }

        if !self.at_states.is_empty() {
            fork.remove_at_states(self.data.height);
        }

        for (tx, undo) in self.transactions.iter().zip(undo.txs.iter()).rev() {
            tx.orphan(fork, undo);
        }

        fork.remove_block_undo(&self.data.signature);
        fork.remove_block(self.data.height);
        Ok(())
    }
}

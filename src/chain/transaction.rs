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

//! Transaction validation and state transition.
//!
//! A transaction moves through three operations: `validate` checks it against
//! the current fork state without touching it, `process` applies its effects
//! and returns the undo record, `orphan` consumes the undo record to restore
//! the fork exactly as it was. Validation and application are always performed
//! inside a database fork so that a failure at any point can be discarded
//! without leftovers.

use crate::{
    base::{
        schema::{
            BalanceUndo, ReferenceUndo, TransactionData, TransactionPayload, TxUndo, ASSET_NATIVE,
        },
        serialize::MessagePack,
    },
    config::ChainConfig,
    crypto::is_valid_address,
    db::DbFork,
    error::{Error, ErrorKind},
    Result,
};

/// Milliseconds a transaction stays acceptable after its creation time.
pub const TRANSACTION_DEADLINE_MS: u64 = 1000 * 60 * 60 * 24;

/// Outcome of transaction and block validation.
///
/// `Ok` means the item can be applied on top of the current fork state, any
/// other variant names the first check that failed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ValidationResult {
    /// All checks passed.
    Ok,
    /// Reference does not match the expected previous signature.
    InvalidReference,
    /// Timestamp outside the acceptable window.
    InvalidTimestamp,
    /// Block generator not entitled to forge the block.
    InvalidGenerator,
    /// Cryptographic signature does not verify.
    InvalidSignature,
    /// Recipient address is not a well formed account address.
    InvalidAddress,
    /// Transferred amount outside the acceptable range.
    NegativeAmount,
    /// Fee below the minimum required for the transaction size.
    InsufficientFee,
    /// Creator balance cannot cover amount plus fee.
    NoBalance,
    /// Transaction already present in the chain.
    Duplicate,
    /// Transaction created after the block or no longer acceptable at the
    /// block timestamp.
    InvalidTransactionTimestamp,
    /// Genesis style content outside the genesis block.
    InvalidGenesis,
    /// Block total fees do not match the contained transactions.
    InvalidFees,
    /// Automated transaction states malformed or not yet enabled.
    InvalidAtState,
}

impl TransactionData {
    /// Latest block timestamp this transaction can be included at.
    pub fn deadline(&self) -> u64 {
        self.timestamp.saturating_add(TRANSACTION_DEADLINE_MS)
    }

    /// Check the envelope signature.
    ///
    /// Genesis transactions carry no creator key, their pseudo signature is
    /// compared against the recomputed one.
    pub fn is_signature_valid(&self) -> bool {
        match (&self.creator, &self.payload) {
            (None, TransactionPayload::Genesis { .. }) => {
                self.signature == self.genesis_signature()
            }
            (Some(creator), _) => creator.verify(&self.signable_bytes(), &self.signature),
            (None, _) => false,
        }
    }

    /// Check the transaction against the fork state. Does not mutate.
    pub fn validate<F: DbFork>(&self, fork: &F, config: &ChainConfig) -> ValidationResult {
        match &self.payload {
            TransactionPayload::Genesis { recipient, amount } => {
                // Consensus critical, keep the comparison direction as deployed.
                if *amount >= 0 {
                    return ValidationResult::NegativeAmount;
                }
                if !is_valid_address(recipient) {
                    return ValidationResult::InvalidAddress;
                }
                ValidationResult::Ok
            }
            TransactionPayload::Payment { recipient, amount } => {
                let creator = match &self.creator {
                    Some(creator) => creator.to_address(),
                    None => return ValidationResult::InvalidSignature,
                };
                if !is_valid_address(recipient) {
                    return ValidationResult::InvalidAddress;
                }
                if *amount <= 0 {
                    return ValidationResult::NegativeAmount;
                }
                if self.fee < config.required_fee(self.serialize().len()) {
                    return ValidationResult::InsufficientFee;
                }
                let balance = fork.load_balance(&creator, ASSET_NATIVE).unwrap_or(0);
                if balance < amount.saturating_add(self.fee) {
                    return ValidationResult::NoBalance;
                }
                let last_reference = fork.load_last_reference(&creator).unwrap_or_default();
                if last_reference != self.reference {
                    return ValidationResult::InvalidReference;
                }
                if fork.contains_transaction(&self.signature) {
                    return ValidationResult::Duplicate;
                }
                ValidationResult::Ok
            }
        }
    }

    /// Apply the transaction effects to the fork.
    ///
    /// Previous values of every touched entry are captured before the
    /// mutation and returned so that [orphan](Self::orphan) can restore them.
    pub fn process<F: DbFork>(&self, fork: &mut F) -> Result<TxUndo> {
        let mut undo = TxUndo::default();

        fork.store_transaction(self.clone());

        match &self.payload {
            TransactionPayload::Genesis { recipient, amount } => {
                undo.balances.push(BalanceUndo {
                    address: recipient.clone(),
                    asset: ASSET_NATIVE,
                    prev: fork.load_balance(recipient, ASSET_NATIVE),
                });
                fork.store_balance(recipient, ASSET_NATIVE, *amount);

                undo.references.push(ReferenceUndo {
                    address: recipient.clone(),
                    prev: fork.load_last_reference(recipient),
                });
                fork.store_last_reference(recipient, self.signature.clone());
            }
            TransactionPayload::Payment { recipient, amount } => {
                let creator = match &self.creator {
                    Some(creator) => creator.to_address(),
                    None => {
                        return Err(Error::new_ext(
                            ErrorKind::MalformedData,
                            "payment without creator",
                        ))
                    }
                };

                let balance = fork.load_balance(&creator, ASSET_NATIVE);
                undo.balances.push(BalanceUndo {
                    address: creator.clone(),
                    asset: ASSET_NATIVE,
                    prev: balance,
                });
                fork.store_balance(
                    &creator,
                    ASSET_NATIVE,
                    balance.unwrap_or(0) - *amount - self.fee,
                );

                let balance = fork.load_balance(recipient, ASSET_NATIVE);
                undo.balances.push(BalanceUndo {
                    address: recipient.clone(),
                    asset: ASSET_NATIVE,
                    prev: balance,
                });
                fork.store_balance(recipient, ASSET_NATIVE, balance.unwrap_or(0) + *amount);

                undo.references.push(ReferenceUndo {
                    address: creator.clone(),
                    prev: fork.load_last_reference(&creator),
                });
                fork.store_last_reference(&creator, self.signature.clone());

                // First incoming payment initializes the recipient chain of
                // references, otherwise the account could never spend.
                if fork.load_last_reference(recipient).is_none() {
                    undo.references.push(ReferenceUndo {
                        address: recipient.clone(),
                        prev: None,
                    });
                    fork.store_last_reference(recipient, self.signature.clone());
                }
            }
        }
        Ok(undo)
    }

    /// Revert the transaction effects using the undo record produced by
    /// [process](Self::process).
    ///
    /// Entries are restored in reverse capture order so that aliased entries
    /// end up with their oldest value.
    pub fn orphan<F: DbFork>(&self, fork: &mut F, undo: &TxUndo) {
        for reference in undo.references.iter().rev() {
            match &reference.prev {
                Some(prev) => fork.store_last_reference(&reference.address, prev.clone()),
                None => fork.remove_last_reference(&reference.address),
            }
        }
        for balance in undo.balances.iter().rev() {
            match balance.prev {
                Some(prev) => fork.store_balance(&balance.address, balance.asset, prev),
                None => fork.remove_balance(&balance.address, balance.asset),
            }
        }
        fork.remove_transaction(&self.signature);
    }
}

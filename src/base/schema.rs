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

//! Chain data structures as they travel on the wire and as they are stored.
//!
//! A block is a `BlockData` header plus the full transactions list and the
//! automated-transaction state snapshots produced at that height. Headers
//! are signed by the generator over the MessagePack serialization with the
//! signature field cleared. Blocks without a generator are genesis style
//! blocks and carry a pseudo signature derived from the header digest.

use crate::{
    base::serialize::MessagePack,
    crypto::{Digest, KeyPair, PublicKey},
    Result,
};

/// Length in bytes of block and transaction signatures.
pub const SIGNATURE_LEN: usize = 64;

/// Asset identifier of the native chain coin.
pub const ASSET_NATIVE: u64 = 0;

/// Block header.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct BlockData {
    /// Position in the chain, starting from 1 for the genesis block.
    pub height: u64,
    /// Generator signature over the serialized header with this field cleared.
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
    /// Signature of the parent block.
    #[serde(with = "serde_bytes")]
    pub reference: Vec<u8>,
    /// Creation time, milliseconds since the epoch.
    pub timestamp: u64,
    /// Generator public key. `None` only for genesis style blocks.
    pub generator: Option<PublicKey>,
    /// Balance the generator staked for this block.
    pub generating_balance: i64,
    /// Sum of the fees of the contained transactions.
    pub total_fees: i64,
    /// Number of contained transactions.
    pub transaction_count: u32,
}

impl BlockData {
    pub fn new(
        height: u64,
        reference: Vec<u8>,
        timestamp: u64,
        generator: Option<PublicKey>,
        generating_balance: i64,
    ) -> Self {
        BlockData {
            height,
            signature: vec![],
            reference,
            timestamp,
            generator,
            generating_balance,
            total_fees: 0,
            transaction_count: 0,
        }
    }

    /// Bytes covered by the generator signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut cleared = self.clone();
        cleared.signature.clear();
        cleared.serialize()
    }

    /// Sign the header with the generator key pair.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        self.signature = keypair.sign(&self.signable_bytes())?;
        Ok(())
    }

    /// Pseudo signature used by genesis style blocks.
    ///
    /// There is no key able to sign the genesis block, the digest of the
    /// signable bytes is duplicated to match the regular signature length.
    pub fn genesis_signature(&self) -> Vec<u8> {
        let digest = Digest::from_data(&self.signable_bytes());
        let mut signature = digest.to_bytes();
        signature.extend_from_slice(digest.as_bytes());
        signature
    }
}

/// Block header summary exchanged during fork weight comparison.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct BlockSummaryData {
    pub height: u64,
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
    pub generator: Option<PublicKey>,
}

impl BlockSummaryData {
    /// Generator key bytes, empty for genesis style blocks.
    pub fn generator_bytes(&self) -> Vec<u8> {
        self.generator
            .as_ref()
            .map(|key| key.to_bytes())
            .unwrap_or_default()
    }
}

impl From<&BlockData> for BlockSummaryData {
    fn from(data: &BlockData) -> Self {
        BlockSummaryData {
            height: data.height,
            signature: data.signature.clone(),
            generator: data.generator.clone(),
        }
    }
}

/// Automated transaction state snapshot produced by a block.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct AtStateData {
    /// Address of the automated transaction account.
    pub address: String,
    /// Digest of the machine state after the block execution.
    #[serde(with = "serde_bytes")]
    pub state_hash: Vec<u8>,
    /// Fees consumed by the machine during the block execution.
    pub fees: i64,
}

/// Full block: header plus content.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Block {
    /// Block header.
    pub data: BlockData,
    /// Transactions in application order.
    pub transactions: Vec<TransactionData>,
    /// Automated transaction states produced at this height.
    pub at_states: Vec<AtStateData>,
}

impl Block {
    pub fn new(
        data: BlockData,
        transactions: Vec<TransactionData>,
        at_states: Vec<AtStateData>,
    ) -> Self {
        Block {
            data,
            transactions,
            at_states,
        }
    }

    /// Header summary of this block.
    pub fn summary(&self) -> BlockSummaryData {
        BlockSummaryData::from(&self.data)
    }
}

/// Transaction type dependent content.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(tag = "kind")]
pub enum TransactionPayload {
    /// Initial coin allocation, only valid within the genesis block.
    #[serde(rename = "genesis")]
    Genesis { recipient: String, amount: i64 },
    /// Native coin transfer.
    #[serde(rename = "payment")]
    Payment { recipient: String, amount: i64 },
}

impl TransactionPayload {
    /// Receiving account address.
    pub fn recipient(&self) -> &str {
        match self {
            TransactionPayload::Genesis { recipient, .. } => recipient,
            TransactionPayload::Payment { recipient, .. } => recipient,
        }
    }

    /// Transferred amount.
    pub fn amount(&self) -> i64 {
        match self {
            TransactionPayload::Genesis { amount, .. } => *amount,
            TransactionPayload::Payment { amount, .. } => *amount,
        }
    }
}

/// Transaction envelope.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct TransactionData {
    /// Submitter public key. `None` only for genesis transactions.
    pub creator: Option<PublicKey>,
    /// Fee payed to the block generator.
    pub fee: i64,
    /// Creation time, milliseconds since the epoch.
    pub timestamp: u64,
    /// Signature of the previous transaction of the creator, empty for
    /// genesis transactions.
    #[serde(with = "serde_bytes")]
    pub reference: Vec<u8>,
    /// Creator signature over the serialized envelope with this field cleared.
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
    /// Type dependent content.
    pub payload: TransactionPayload,
}

impl TransactionData {
    pub fn new(
        creator: Option<PublicKey>,
        fee: i64,
        timestamp: u64,
        reference: Vec<u8>,
        payload: TransactionPayload,
    ) -> Self {
        TransactionData {
            creator,
            fee,
            timestamp,
            reference,
            signature: vec![],
            payload,
        }
    }

    /// Bytes covered by the creator signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut cleared = self.clone();
        cleared.signature.clear();
        cleared.serialize()
    }

    /// Sign the envelope with the creator key pair.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        self.signature = keypair.sign(&self.signable_bytes())?;
        Ok(())
    }

    /// Pseudo signature used by genesis transactions.
    ///
    /// There is no key for the genesis account, the digest of the signable
    /// bytes is duplicated to match the regular signature length.
    pub fn genesis_signature(&self) -> Vec<u8> {
        let digest = Digest::from_data(&self.signable_bytes());
        let mut signature = digest.to_bytes();
        signature.extend_from_slice(digest.as_bytes());
        signature
    }
}

/// Previous value of a balance entry touched by a block or transaction.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct BalanceUndo {
    pub address: String,
    pub asset: u64,
    /// `None` when the entry did not exist.
    pub prev: Option<i64>,
}

/// Previous value of an account last-reference entry.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ReferenceUndo {
    pub address: String,
    /// `None` when the entry did not exist.
    #[serde(with = "serde_bytes")]
    pub prev: Option<Vec<u8>>,
}

/// Effects of a single transaction, recorded while processing so that the
/// orphan operation can restore the previous values exactly.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct TxUndo {
    pub balances: Vec<BalanceUndo>,
    pub references: Vec<ReferenceUndo>,
}

/// Effects of a whole block, one `TxUndo` per transaction in application
/// order plus the block level balance movements (generator settlement).
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct BlockUndo {
    pub txs: Vec<TxUndo>,
    pub balances: Vec<BalanceUndo>,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::base::serialize::{rmp_deserialize, rmp_serialize};

    // RFC 8032 test key pairs (secret concatenated with public).
    const KEYPAIRS_HEX: [&str; 4] = [
        "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
        "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c",
        "c5aa8df43f9f837bedb7442f31dcb7b166d38535076f094b85ce3a2e0b4458f7fc51cd8e6218a1a38da47ed00230f0580816ed13ba3303ac5deb911548908025",
        "f5e5767cf153319517630f226876b86c8160cc583bc013744c6bf255f5cc0ee5278117fc144c72340f67d0f2316e8386ceffbf2b2428c9c51fef7c597f1d426e",
    ];

    /// Deterministic test key pair. Four distinct pairs are available.
    pub fn create_test_keypair(index: usize) -> KeyPair {
        let bytes = hex::decode(KEYPAIRS_HEX[index % KEYPAIRS_HEX.len()]).unwrap();
        KeyPair::from_bytes(&bytes).unwrap()
    }

    pub fn create_test_block_data() -> BlockData {
        BlockData {
            height: 2,
            signature: vec![7; SIGNATURE_LEN],
            reference: vec![9; SIGNATURE_LEN],
            timestamp: 180_000,
            generator: Some(create_test_keypair(0).public_key()),
            generating_balance: 10_000,
            total_fees: 20,
            transaction_count: 1,
        }
    }

    pub fn create_test_transaction() -> TransactionData {
        TransactionData {
            creator: Some(create_test_keypair(1).public_key()),
            fee: 10,
            timestamp: 179_000,
            reference: vec![5; SIGNATURE_LEN],
            signature: vec![8; SIGNATURE_LEN],
            payload: TransactionPayload::Payment {
                recipient: "dest-account".to_string(),
                amount: 500,
            },
        }
    }

    pub fn create_test_block() -> Block {
        Block::new(
            create_test_block_data(),
            vec![create_test_transaction()],
            vec![],
        )
    }

    pub fn create_test_summary() -> BlockSummaryData {
        BlockSummaryData::from(&create_test_block_data())
    }

    pub const BLOCK_DATA_HEX: &str = "9802c44007070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707c44009090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909090909ce0002bf20c420d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511acd27101401";

    pub const TRANSACTION_HEX: &str = "96c4203d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c0ace0002bb38c44005050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505050505c4400808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080808080893a77061796d656e74ac646573742d6163636f756e74cd01f4";

    pub const SUMMARY_HEX: &str = "9302c44007070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707070707c420d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    #[test]
    fn block_data_serialize() {
        let data = create_test_block_data();

        let buf = rmp_serialize(&data).unwrap();

        assert_eq!(hex::encode(&buf), BLOCK_DATA_HEX);
    }

    #[test]
    fn block_data_deserialize() {
        let expected = create_test_block_data();
        let buf = hex::decode(BLOCK_DATA_HEX).unwrap();

        let data: BlockData = rmp_deserialize(&buf).unwrap();

        assert_eq!(data, expected);
    }

    #[test]
    fn transaction_serialize() {
        let tx = create_test_transaction();

        let buf = rmp_serialize(&tx).unwrap();

        assert_eq!(hex::encode(&buf), TRANSACTION_HEX);
    }

    #[test]
    fn transaction_deserialize() {
        let expected = create_test_transaction();
        let buf = hex::decode(TRANSACTION_HEX).unwrap();

        let tx: TransactionData = rmp_deserialize(&buf).unwrap();

        assert_eq!(tx, expected);
    }

    #[test]
    fn summary_serialize() {
        let summary = create_test_summary();

        let buf = rmp_serialize(&summary).unwrap();

        assert_eq!(hex::encode(&buf), SUMMARY_HEX);
    }

    #[test]
    fn block_roundtrip() {
        let block = create_test_block();

        let buf = rmp_serialize(&block).unwrap();
        let back: Block = rmp_deserialize(&buf).unwrap();

        assert_eq!(back, block);
    }

    #[test]
    fn block_data_sign_verify() {
        let keypair = create_test_keypair(0);
        let mut data = create_test_block_data();

        data.sign(&keypair).unwrap();

        assert_eq!(data.signature.len(), SIGNATURE_LEN);
        assert!(keypair
            .public_key()
            .verify(&data.signable_bytes(), &data.signature));

        data.timestamp += 1;
        assert!(!keypair
            .public_key()
            .verify(&data.signable_bytes(), &data.signature));
    }

    #[test]
    fn block_data_signable_skips_signature() {
        let mut data = create_test_block_data();
        let bytes1 = data.signable_bytes();

        data.signature = vec![0xaa; SIGNATURE_LEN];
        let bytes2 = data.signable_bytes();

        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn genesis_signature_shape() {
        let mut data = create_test_block_data();
        data.height = 1;
        data.generator = None;
        data.signature.clear();

        let signature = data.genesis_signature();

        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert_eq!(signature[..32], signature[32..]);
        assert_eq!(signature, data.genesis_signature());
    }

    #[test]
    fn transaction_sign_verify() {
        let keypair = create_test_keypair(1);
        let mut tx = create_test_transaction();

        tx.sign(&keypair).unwrap();

        assert!(keypair
            .public_key()
            .verify(&tx.signable_bytes(), &tx.signature));

        tx.fee += 1;
        assert!(!keypair
            .public_key()
            .verify(&tx.signable_bytes(), &tx.signature));
    }

    #[test]
    fn genesis_transaction_signature_shape() {
        let mut tx = create_test_transaction();
        tx.creator = None;
        tx.reference.clear();
        tx.signature.clear();
        tx.payload = TransactionPayload::Genesis {
            recipient: "dest-account".to_string(),
            amount: 1_000,
        };

        let signature = tx.genesis_signature();

        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert_eq!(signature[..32], signature[32..]);
    }

    #[test]
    fn summary_from_block_data() {
        let data = create_test_block_data();

        let summary = BlockSummaryData::from(&data);

        assert_eq!(summary.height, data.height);
        assert_eq!(summary.signature, data.signature);
        assert_eq!(
            summary.generator_bytes(),
            data.generator.unwrap().to_bytes()
        );
    }

    #[test]
    fn summary_generator_bytes_genesis() {
        let mut summary = create_test_summary();
        summary.generator = None;

        assert!(summary.generator_bytes().is_empty());
    }

    #[test]
    fn undo_records_roundtrip() {
        let undo = BlockUndo {
            txs: vec![TxUndo {
                balances: vec![BalanceUndo {
                    address: "dest-account".to_string(),
                    asset: ASSET_NATIVE,
                    prev: None,
                }],
                references: vec![ReferenceUndo {
                    address: "dest-account".to_string(),
                    prev: Some(vec![5; SIGNATURE_LEN]),
                }],
            }],
            balances: vec![BalanceUndo {
                address: "generator-account".to_string(),
                asset: ASSET_NATIVE,
                prev: Some(42),
            }],
        };

        let buf = rmp_serialize(&undo).unwrap();
        let back: BlockUndo = rmp_deserialize(&buf).unwrap();

        assert_eq!(back, undo);
    }
}

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

//! Messages exchanged between nodes during chain synchronization and used to
//! interact with the local chain service.

use crate::{
    base::schema::{Block, BlockSummaryData},
    channel, Error,
};
use serde_bytes::ByteBuf;

/// Sync protocol version advertised by this node.
///
/// Peers speaking at least version 2 understand the growing-step signatures
/// probe, older peers are probed with fixed size batches.
pub const PROTOCOL_VERSION: u32 = 2;

/// Message types enumeration.
///
/// TODO
/// Enum variants are internally tagged as strings.
/// We will switch to integer tags as soon as
/// [this](https://github.com/serde-rs/serde/pull/2056) is merged.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(clippy::large_enum_variant)]
pub enum Message {
    /// Exception response used for the full set of messages.
    #[serde(rename = "0")]
    Exception(Error),
    /// Get chain height request.
    #[serde(rename = "1")]
    GetHeightRequest,
    /// Get chain height response.
    #[serde(rename = "2")]
    GetHeightResponse {
        /// Height of the last block in the chain.
        height: u64,
    },
    /// Get block signatures request.
    #[serde(rename = "3")]
    GetSignaturesRequest {
        /// Signature of the block preceding the first requested one.
        #[serde(with = "serde_bytes")]
        parent: Vec<u8>,
    },
    /// Get block signatures response.
    #[serde(rename = "4")]
    GetSignaturesResponse {
        /// Signatures of the blocks following the parent, in chain order.
        signatures: Vec<ByteBuf>,
    },
    /// Get block summaries request.
    #[serde(rename = "5")]
    GetBlockSummariesRequest {
        /// Signature of the block preceding the first requested one.
        #[serde(with = "serde_bytes")]
        parent: Vec<u8>,
        /// Maximum number of summaries to return.
        count: u64,
    },
    /// Get block summaries response.
    #[serde(rename = "6")]
    GetBlockSummariesResponse {
        /// Summaries of the blocks following the parent, in chain order.
        summaries: Vec<BlockSummaryData>,
    },
    /// Get block request.
    #[serde(rename = "7")]
    GetBlockRequest {
        /// Signature of the requested block.
        #[serde(with = "serde_bytes")]
        signature: Vec<u8>,
    },
    /// Get block response.
    #[serde(rename = "8")]
    GetBlockResponse {
        /// `Block` structure.
        block: Block,
    },
    /// Stop chain service.
    #[serde(rename = "254")]
    Stop,
}

/// Chain request sender alias.
pub type ChainRequestSender = channel::RequestSender<Message, Message>;

/// Chain request receiver alias.
pub type ChainRequestReceiver = channel::RequestReceiver<Message, Message>;

/// Chain response sender alias.
pub type ChainResponseSender = channel::Sender<Message>;

/// Chain response receiver alias.
pub type ChainResponseReceiver = channel::Receiver<Message>;

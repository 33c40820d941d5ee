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

//! Incoming chain messages handler.
//!
//! Serves the requests that remote nodes issue while they synchronize with
//! us. Read only, never touches the chain lock.

use crate::{
    base::schema::BlockSummaryData,
    chain::{blockchain::BlockChain, message::Message, synchronizer::MAXIMUM_BLOCK_STEP},
    db::Db,
    error::{Error, ErrorKind},
};
use serde_bytes::ByteBuf;

pub(crate) struct Dispatcher<D: Db> {
    chain: BlockChain<D>,
}

impl<D: Db> Clone for Dispatcher<D> {
    fn clone(&self) -> Self {
        Dispatcher {
            chain: self.chain.clone(),
        }
    }
}

impl<D: Db> Dispatcher<D> {
    pub fn new(chain: BlockChain<D>) -> Self {
        Dispatcher { chain }
    }

    /// Handle a single request message and build the response.
    ///
    /// Messages that are not requests get no response.
    pub fn message(&self, request: Message) -> Option<Message> {
        match request {
            Message::GetHeightRequest => Some(Message::GetHeightResponse {
                height: self.chain.height(),
            }),
            Message::GetSignaturesRequest { parent } => Some(self.get_signatures(&parent)),
            Message::GetBlockSummariesRequest { parent, count } => {
                Some(self.get_block_summaries(&parent, count))
            }
            Message::GetBlockRequest { signature } => Some(self.get_block(&signature)),
            _ => None,
        }
    }

    /// Signatures of the blocks following `parent`, in chain order.
    ///
    /// An unknown parent yields an empty list, that is how a probing peer
    /// learns that we do not share that part of its chain.
    fn get_signatures(&self, parent: &[u8]) -> Message {
        let db = self.chain.db.read();
        let signatures = match db.load_block_by_signature(parent) {
            Some(block) => {
                let first = block.data.height + 1;
                let last = db.height().min(block.data.height + MAXIMUM_BLOCK_STEP);
                (first..=last)
                    .filter_map(|height| db.load_block(height))
                    .map(|block| ByteBuf::from(block.data.signature))
                    .collect()
            }
            None => vec![],
        };
        Message::GetSignaturesResponse { signatures }
    }

    /// Header summaries of the blocks following `parent`, in chain order.
    fn get_block_summaries(&self, parent: &[u8], count: u64) -> Message {
        let db = self.chain.db.read();
        let summaries: Vec<BlockSummaryData> = match db.load_block_by_signature(parent) {
            Some(block) => {
                let first = block.data.height + 1;
                let last = db
                    .height()
                    .min(block.data.height + count.min(MAXIMUM_BLOCK_STEP));
                (first..=last)
                    .filter_map(|height| db.load_block(height))
                    .map(|block| block.summary())
                    .collect()
            }
            None => vec![],
        };
        Message::GetBlockSummariesResponse { summaries }
    }

    fn get_block(&self, signature: &[u8]) -> Message {
        match self.chain.db.read().load_block_by_signature(signature) {
            Some(block) => Message::GetBlockResponse { block },
            None => {
                Message::Exception(Error::new_ext(ErrorKind::ResourceNotFound, "unknown block"))
            }
        }
    }
}

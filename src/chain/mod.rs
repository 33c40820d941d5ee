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

//! Chain service components.
//!
//! This module contains the logic to validate, apply and revert blocks and to
//! keep the local chain consistent with the rest of the network.
//!
//! The service exploits several sub-modules to perform specialized works, in
//! particular:
//! - dispatcher: handle incoming chain messages.
//! - blockchain: chain bookkeeping, startup validation and fork weighting.
//! - synchronizer: keeps our state up-to-date with the other nodes.
//!
//! The chain service is the main user of the db module.
//!
//! External components can interact with the chain service via message
//! passing.

pub(crate) mod block;
pub(crate) mod dispatcher;
pub(crate) mod distance;
pub(crate) mod transaction;

pub mod blockchain;
pub mod message;
pub mod peer;
pub mod service;
pub mod synchronizer;

pub use blockchain::BlockChain;
pub use message::{
    ChainRequestReceiver, ChainRequestSender, ChainResponseReceiver, ChainResponseSender, Message,
};
pub use peer::PeerLink;
pub use service::ChainService;
pub use synchronizer::{SyncFault, SyncStatus, Synchronizer};
pub use transaction::ValidationResult;

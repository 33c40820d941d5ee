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

//! Chain service.
//!
//! Runs a worker thread serving the chain requests received from the
//! service channel, one request at a time.

use super::{
    blockchain::BlockChain,
    dispatcher::Dispatcher,
    message::{ChainRequestReceiver, ChainRequestSender, Message},
};
use crate::{base::RwLock, channel::confirmed_channel, config::ChainConfig, db::Db};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Chain worker, replies to the requests received from the service channel.
struct ChainWorker<D: Db> {
    /// Requests handler.
    dispatcher: Dispatcher<D>,
    /// To receive messages from the service users.
    rx_chan: ChainRequestReceiver,
}

impl<D: Db> ChainWorker<D> {
    fn new(chain: BlockChain<D>, rx_chan: ChainRequestReceiver) -> Self {
        ChainWorker {
            dispatcher: Dispatcher::new(chain),
            rx_chan,
        }
    }

    fn run(&mut self) {
        loop {
            match self.rx_chan.recv_sync() {
                Ok((Message::Stop, _)) => break,
                Ok((request, res_chan)) => {
                    if let Some(response) = self.dispatcher.message(request) {
                        if res_chan.send_sync(response).is_err() {
                            debug!("request submitter has gone away");
                        }
                    }
                }
                Err(_) => break,
            }
        }
    }
}

/// Chain service data.
pub struct ChainService<D: Db> {
    /// Worker object.
    worker: Option<ChainWorker<D>>,
    /// Threads data.
    handler: Option<JoinHandle<ChainWorker<D>>>,
    /// To send messages to worker.
    tx_chan: ChainRequestSender,
    /// Shared chain components.
    chain: BlockChain<D>,
    /// To check if the worker thread is still alive.
    canary: Arc<()>,
}

impl<D: Db> ChainService<D> {
    /// Create a new chain service instance.
    pub fn new(config: ChainConfig, db: D) -> Self {
        let (tx_chan, rx_chan) = confirmed_channel::<Message, Message>();
        let chain = BlockChain::new(Arc::new(config), Arc::new(RwLock::new(db)));
        let worker = ChainWorker::new(chain.clone(), rx_chan);

        ChainService {
            worker: Some(worker),
            handler: None,
            tx_chan,
            chain,
            canary: Arc::new(()),
        }
    }

    /// Start chain service.
    pub fn start(&mut self) {
        debug!("Starting chain service");
        let mut worker = match self.worker.take() {
            Some(worker) => worker,
            None => {
                warn!("service was already running");
                return;
            }
        };

        let mut canary = Arc::clone(&self.canary);
        let handle = thread::spawn(move || {
            let _ = Arc::get_mut(&mut canary);
            worker.run();
            worker
        });
        self.handler = Some(handle);
    }

    /// Stop chain service.
    pub fn stop(&mut self) {
        debug!("Stopping chain service");
        match self.handler.take() {
            Some(handle) => {
                if let Err(err) = self.tx_chan.send_sync(Message::Stop) {
                    error!("Error stopping chain service thread: {:?}", err);
                }
                let worker = handle.join().unwrap();
                self.worker = Some(worker);
            }
            None => {
                debug!("service was not running");
            }
        };
    }

    /// Check if service is running.
    pub fn is_running(&self) -> bool {
        // Hack to intercept crashed subthreads.
        Arc::strong_count(&self.canary) == 2 && self.worker.is_none()
    }

    /// Get a clone of chain-service input channel.
    pub fn request_channel(&self) -> ChainRequestSender {
        self.tx_chan.clone()
    }

    /// Get a handle to the shared chain components.
    pub fn chain(&self) -> BlockChain<D> {
        self.chain.clone()
    }
}

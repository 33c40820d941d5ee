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

//! Peer abstraction used during synchronization.

use crate::chain::message::{ChainRequestSender, Message};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Time to wait for a peer response before giving up.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Link to a remote node.
///
/// Transport and wire framing live outside the library. Whoever drives a
/// synchronization provides an implementation able to exchange already
/// deserialized messages with the remote side.
#[cfg_attr(test, automock)]
pub trait PeerLink {
    /// Chain height declared by the peer.
    fn height(&self) -> u64;

    /// Sync protocol version spoken by the peer.
    fn version(&self) -> u32;

    /// Send a request and wait for the matching response.
    ///
    /// `None` when the peer does not answer in time or the link is broken.
    fn exchange(&self, request: Message) -> Option<Message>;
}

/// Peer reachable through a confirmed channel.
///
/// Requests are forwarded to the channel owner, typically the network layer,
/// and the first response is handed back. The protocol version comes from
/// the handshake data, the height is asked to the remote side on demand.
pub struct ChannelPeer {
    version: u32,
    chan: ChainRequestSender,
}

impl ChannelPeer {
    pub fn new(version: u32, chan: ChainRequestSender) -> Self {
        ChannelPeer { version, chan }
    }
}

impl PeerLink for ChannelPeer {
    fn height(&self) -> u64 {
        match self.exchange(Message::GetHeightRequest) {
            Some(Message::GetHeightResponse { height }) => height,
            _ => 0,
        }
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn exchange(&self, request: Message) -> Option<Message> {
        let receiver = self.chan.send_sync(request).ok()?;
        receiver.recv_timeout_sync(RESPONSE_TIMEOUT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;
    use std::thread;

    #[test]
    fn channel_peer_exchange() {
        let (tx_chan, rx_chan) = channel::confirmed_channel::<Message, Message>();
        let peer = ChannelPeer::new(2, tx_chan);

        let responder = thread::spawn(move || {
            let (req, res_chan) = rx_chan.recv_sync().unwrap();
            assert_eq!(req, Message::GetHeightRequest);
            res_chan
                .send_sync(Message::GetHeightResponse { height: 42 })
                .unwrap();
        });

        let res = peer.exchange(Message::GetHeightRequest);

        responder.join().unwrap();
        assert_eq!(res, Some(Message::GetHeightResponse { height: 42 }));
    }

    #[test]
    fn channel_peer_height_refresh() {
        let (tx_chan, rx_chan) = channel::confirmed_channel::<Message, Message>();
        let peer = ChannelPeer::new(2, tx_chan);

        let responder = thread::spawn(move || {
            let (req, res_chan) = rx_chan.recv_sync().unwrap();
            assert_eq!(req, Message::GetHeightRequest);
            res_chan
                .send_sync(Message::GetHeightResponse { height: 42 })
                .unwrap();
        });

        let height = peer.height();

        responder.join().unwrap();
        assert_eq!(height, 42);
    }

    #[test]
    fn channel_peer_broken_link() {
        let (tx_chan, rx_chan) = channel::confirmed_channel::<Message, Message>();
        drop(rx_chan);
        let peer = ChannelPeer::new(2, tx_chan);

        assert_eq!(peer.exchange(Message::GetHeightRequest), None);
        assert_eq!(peer.height(), 0);
    }
}

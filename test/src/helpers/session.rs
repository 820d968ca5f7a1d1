use ticksync::{
    IncomingMessage, PeerId, PeerIdAllocator, SessionConfig, SimulationBuffer, SimulationConfig,
    Tick,
};

use super::messages::to_incoming;

/// One session participant: a buffer plus everything it has delivered.
pub struct TestPeer {
    pub id: PeerId,
    pub buffer: Box<dyn SimulationBuffer>,
    pub delivered: Vec<IncomingMessage>,
}

/// A whole session driven in lockstep frames with instant, lossless
/// delivery between every peer. The first peer is the authority.
pub struct TestSession {
    pub peers: Vec<TestPeer>,
}

pub const TEST_TICK_RATE: u32 = 50;
pub const TEST_START_TICK: u32 = 100;

impl TestSession {
    pub fn new(config: SimulationConfig, latency: u32, peer_count: usize) -> Self {
        let mut allocator = PeerIdAllocator::new();
        let ids: Vec<PeerId> = (0..peer_count).map(|_| allocator.next_id()).collect();
        let authority = ids[0];

        let mut peers = Vec::new();
        for &id in &ids {
            let mut buffer = config.build();
            buffer.init_buffer(&SessionConfig {
                tick_rate: TEST_TICK_RATE,
                latency,
                start_tick: Tick::new(TEST_START_TICK),
                local_id: id,
                authority_id: authority,
            });
            peers.push(TestPeer {
                id,
                buffer,
                delivered: Vec::new(),
            });
        }

        // every peer registers every other peer as a tick source; the
        // authority queues a bootstrap message per registration
        for i in 0..peers.len() {
            for j in 0..peers.len() {
                if i != j {
                    let other = peers[j].id;
                    peers[i].buffer.add_tick_source(other);
                }
            }
        }

        Self { peers }
    }

    pub fn authority_id(&self) -> PeerId {
        self.peers[0].id
    }

    pub fn peer_mut(&mut self, id: PeerId) -> &mut TestPeer {
        self.peers
            .iter_mut()
            .find(|peer| peer.id == id)
            .expect("peer is part of the session")
    }

    /// Route every queued outgoing message to its recipients.
    pub fn exchange(&mut self) {
        let mut in_flight = Vec::new();
        for peer in &mut self.peers {
            while let Some(message) = peer.buffer.try_get_next_outgoing() {
                in_flight.push(message);
            }
        }

        for message in in_flight {
            for peer in &mut self.peers {
                if peer.id == message.caller {
                    continue;
                }
                if !message.callee.is_none() && message.callee != peer.id {
                    continue;
                }
                peer.buffer.add_incoming(to_incoming(&message));
            }
        }
    }

    /// One frame for every peer: advance ticks, exchange packets, then
    /// drain whatever each buffer is willing to surface.
    pub fn run_frame(&mut self) {
        for peer in &mut self.peers {
            peer.buffer.next_tick();
        }
        self.exchange();
        for peer in &mut self.peers {
            while let Some(message) = peer.buffer.try_get_next_incoming() {
                peer.delivered.push(message);
            }
        }
    }

    pub fn run_frames(&mut self, frames: usize) {
        for _ in 0..frames {
            self.run_frame();
        }
    }
}

use std::collections::VecDeque;

use crate::{
    buffer::{SessionConfig, SimulationBuffer, SimulationEvent},
    ids::PeerId,
    messages::{IncomingMessage, OutgoingMessage},
    tick::Tick,
};

/// The default strategy: plain FIFO delivery with no tick semantics.
/// Delivery order is arrival order, tick operations are no-ops, and no
/// control messages are produced. Used when cross-peer ordering guarantees
/// are unnecessary.
pub struct MessageQueue {
    incoming: VecDeque<IncomingMessage>,
    outgoing: VecDeque<OutgoingMessage>,
    cur_tick: Tick,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            incoming: VecDeque::new(),
            outgoing: VecDeque::new(),
            cur_tick: Tick::ZERO,
        }
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuffer for MessageQueue {
    fn init_buffer(&mut self, config: &SessionConfig) {
        self.cur_tick = config.start_tick;
    }

    fn update_authority(&mut self, _authority: PeerId) {}

    fn add_tick_source(&mut self, _peer: PeerId) {}

    fn remove_tick_source(&mut self, _peer: PeerId) {}

    fn next_tick(&mut self) {}

    fn present_tick(&self) -> Tick {
        self.cur_tick
    }

    fn local_tick(&self) -> Tick {
        self.cur_tick
    }

    fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn add_outgoing(&mut self, message: OutgoingMessage) {
        self.outgoing.push_back(message);
    }

    fn try_get_next_outgoing(&mut self) -> Option<OutgoingMessage> {
        self.outgoing.pop_front()
    }

    fn add_incoming(&mut self, message: IncomingMessage) {
        self.incoming.push_back(message);
    }

    fn try_get_next_incoming(&mut self) -> Option<IncomingMessage> {
        self.incoming.pop_front()
    }

    fn poll_event(&mut self) -> Option<SimulationEvent> {
        None
    }
}

use std::collections::{HashMap, VecDeque};

use log::{info, trace, warn};

use crate::{
    buffer::{
        tick_queue::TickQueue, SessionConfig, SimulationBuffer, SimulationEvent,
    },
    ids::{PeerId, RpcId},
    messages::{
        control::{cur_tick_message, next_tick_broadcasts, try_decode_tick_message},
        IncomingMessage, OutgoingMessage,
    },
    tick::Tick,
    tick_pair::TickPair,
    timestamp::Timestamp,
};

/// Strategy requiring global tick agreement before simulating: messages
/// are sorted by tick, and delivery stops between ticks until every
/// registered peer has reported moving past them. Identical tick contents
/// simulate in identical order on every peer.
pub struct Lockstep {
    incoming: TickQueue<IncomingMessage>,
    outgoing: TickQueue<OutgoingMessage>,

    /// What tick each registered peer is on, per channel.
    session_ticks: HashMap<PeerId, TickPair>,

    /// The speculative frontier local input is tagged with.
    local_tick: Tick,
    /// The tick currently being simulated.
    present_tick: Tick,
    /// Delivery for the frame stops at this tick.
    exit_tick: Tick,
    /// The newest tick every registered peer has moved past.
    last_complete_tick: Tick,

    max_ticks: u32,
    tick_rate: u32,
    latency: u32,

    local_id: PeerId,
    authority: PeerId,

    initialized: bool,
    synced: bool,
    require_catchup: bool,

    events: VecDeque<SimulationEvent>,
}

impl Lockstep {
    pub fn new() -> Self {
        Self {
            incoming: TickQueue::new(),
            outgoing: TickQueue::new(),
            session_ticks: HashMap::new(),
            local_tick: Tick::ZERO,
            present_tick: Tick::ZERO,
            exit_tick: Tick::ZERO,
            last_complete_tick: Tick::ZERO,
            max_ticks: 0,
            tick_rate: 0,
            latency: 0,
            local_id: PeerId::NONE,
            authority: PeerId::NONE,
            initialized: false,
            synced: false,
            require_catchup: false,
            events: VecDeque::new(),
        }
    }

    fn broadcast_next_tick(&mut self) {
        let timestamp = Timestamp::now_millis_or_zero();
        for message in next_tick_broadcasts(self.local_id, self.local_tick, timestamp) {
            self.outgoing.push(message.tick, message);
        }
    }

    /// Authority bootstrap: adopt the session tick, compensate the local
    /// frontier for measured one-way latency, and open the gates.
    fn handle_cur_tick(&mut self, message: IncomingMessage) {
        if message.caller != self.authority {
            trace!(
                "Discarding session tick from {}, which is not the authority.",
                message.caller
            );
            return;
        }
        if self.synced {
            trace!("Discarding stale session tick; already synchronized.");
            return;
        }

        let decoded = match try_decode_tick_message(&message.payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("Discarding malformed session tick message: {err}");
                return;
            }
        };

        let now = Timestamp::now_millis_or_zero();
        self.latency = (now - decoded.timestamp).max(0) as u32;
        let latency_ticks = if self.tick_rate == 0 {
            0
        } else {
            self.latency / self.tick_rate
        };

        self.present_tick = decoded.tick;
        self.local_tick = decoded.tick.advanced_by(latency_ticks);
        self.exit_tick = self.present_tick.next();
        self.last_complete_tick = self.present_tick.prev();
        self.synced = true;

        self.broadcast_next_tick();

        // anything queued before synchronization carries the sentinel tick
        for mut queued in self.outgoing.drain_tick(Tick::ZERO) {
            queued.tick = self.local_tick;
            self.outgoing.push(queued.tick, queued);
        }

        info!(
            "Received session tick value from authority of {}. Compensated for {} ms of latency, local tick is now {}.",
            decoded.tick, self.latency, self.local_tick
        );
    }

    /// A peer moved to a new tick. If it was the last peer still on the
    /// previous tick, that tick is complete.
    fn handle_next_tick(&mut self, message: IncomingMessage) {
        let Some(pair) = self.session_ticks.get_mut(&message.caller) else {
            return;
        };
        let prev_tick = pair.select(message.protocol);
        pair.update(message.protocol, message.tick);

        let min_tick = self
            .session_ticks
            .values()
            .map(TickPair::min)
            .min()
            .unwrap_or(Tick::ZERO);

        if prev_tick < min_tick && prev_tick >= self.last_complete_tick {
            self.incoming.push(
                prev_tick,
                IncomingMessage::end_tick_marker(self.local_id, prev_tick),
            );
            self.last_complete_tick = prev_tick;
            self.events
                .push_back(SimulationEvent::TickComplete { tick: prev_tick });

            info!("Received all messages for tick {}.", self.last_complete_tick);

            let behind = self.last_complete_tick.since(self.present_tick);
            if !self.require_catchup && behind > self.max_ticks {
                self.require_catchup = true;
                self.events
                    .push_back(SimulationEvent::CatchupStarted { behind });
                info!(
                    "Simulation is too far behind (current simulated tick: {}, newest complete tick: {}), catching up.",
                    self.present_tick, self.last_complete_tick
                );
            }
        }
    }

    fn clear_catchup(&mut self) {
        if self.require_catchup {
            self.require_catchup = false;
            self.events.push_back(SimulationEvent::CatchupEnded);
        }
    }
}

impl Default for Lockstep {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuffer for Lockstep {
    fn init_buffer(&mut self, config: &SessionConfig) {
        let latency_ticks = config.latency_ticks();
        self.max_ticks = (latency_ticks * 6).max(5);
        self.tick_rate = config.tick_rate;
        self.latency = config.latency;
        self.local_id = config.local_id;
        self.authority = config.authority_id;
        self.present_tick = config.start_tick;
        self.exit_tick = self.present_tick.next();
        self.last_complete_tick = self.present_tick;
        self.initialized = true;
        self.synced = config.is_authority();
        self.local_tick = if self.synced {
            // seed the frontier ahead so peer input has time to arrive
            self.present_tick.advanced_by(latency_ticks.max(5))
        } else {
            self.present_tick
        };

        info!(
            "Lockstep simulation buffer initialized with a tick capacity of {} given a latency of {} ms.",
            self.max_ticks, self.latency
        );
    }

    fn update_authority(&mut self, authority: PeerId) {
        self.authority = authority;
    }

    fn add_tick_source(&mut self, peer: PeerId) {
        self.session_ticks
            .insert(peer, TickPair::seeded(self.local_tick));

        if self.authority == self.local_id {
            let timestamp = Timestamp::now_millis_or_zero();
            let message = cur_tick_message(self.local_id, peer, self.local_tick, timestamp);
            self.outgoing.push(message.tick, message);
            info!("Sending session tick {} to {}.", self.local_tick, peer);
        }
    }

    fn remove_tick_source(&mut self, peer: PeerId) {
        self.session_ticks.remove(&peer);
    }

    fn next_tick(&mut self) {
        self.local_tick = self.local_tick.next();
        self.exit_tick = self.present_tick.next();
        trace!("Simulation moved to next tick: {}.", self.local_tick);

        if !self.initialized || !self.synced {
            return;
        }
        self.broadcast_next_tick();
    }

    fn present_tick(&self) -> Tick {
        self.present_tick
    }

    fn local_tick(&self) -> Tick {
        self.local_tick
    }

    fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn add_outgoing(&mut self, mut message: OutgoingMessage) {
        message.tick = if self.synced {
            self.local_tick
        } else {
            Tick::ZERO
        };
        self.outgoing.push(message.tick, message);
    }

    fn try_get_next_outgoing(&mut self) -> Option<OutgoingMessage> {
        if !self.synced {
            return None;
        }
        self.outgoing.pop().map(|(_, message)| message)
    }

    fn add_incoming(&mut self, mut message: IncomingMessage) {
        if message.rpc_id.is_tick_control() {
            match message.rpc_id {
                RpcId::CUR_TICK => self.handle_cur_tick(message),
                RpcId::NEXT_TICK => self.handle_next_tick(message),
                // frame markers are local-only, never off the wire
                _ => warn!("Discarding end-tick message from {}.", message.caller),
            }
            return;
        }

        // invoke on caller: already tagged by the outgoing path
        if message.caller == self.local_id {
            self.incoming.push(message.tick, message);
            return;
        }

        match self.session_ticks.get(&message.caller) {
            Some(pair) => message.tick = pair.select(message.protocol),
            None => message.tick = self.local_tick,
        }
        self.incoming.push(message.tick, message);
    }

    fn try_get_next_incoming(&mut self) -> Option<IncomingMessage> {
        // the actual lockstep wait: nothing surfaces past global agreement
        if !self.session_ticks.is_empty() && self.present_tick > self.last_complete_tick {
            return None;
        }

        let Some((tick, front)) = self.incoming.peek() else {
            self.clear_catchup();
            return None;
        };

        // a marker ends the frame, pulling the present up over any ticks
        // the session skipped entirely
        if front.is_end_tick_marker() {
            self.incoming.pop();
            self.present_tick = self.present_tick.next().max(tick);
            self.exit_tick = self.present_tick.next();
            if self.last_complete_tick.since(self.present_tick) <= self.max_ticks {
                self.clear_catchup();
            }
            return None;
        }

        if tick >= self.exit_tick {
            if tick > self.last_complete_tick {
                return None;
            }
            // every peer already left this tick even though no marker got
            // us here, which happens when completion jumps over ticks that
            // never fired one; snap the present forward and surface it
            self.present_tick = tick;
            self.exit_tick = tick.next();
        }

        self.incoming.pop().map(|(_, message)| message)
    }

    fn poll_event(&mut self) -> Option<SimulationEvent> {
        self.events.pop_front()
    }
}

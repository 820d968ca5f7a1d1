use std::collections::{HashMap, VecDeque};

use log::{info, trace, warn};

use crate::{
    buffer::{
        message_stack::MessageStack, tick_queue::TickQueue, SessionConfig, SimulationBuffer,
        SimulationEvent,
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

/// Strategy that simulates optimistically and corrects retroactively:
/// the present tick advances as messages arrive instead of waiting for
/// global agreement, every delivered message is retained, and a message
/// arriving for an already-simulated tick rewinds retained history back
/// into the delivery queue for resimulation.
pub struct Rollback {
    incoming: TickQueue<IncomingMessage>,
    outgoing: TickQueue<OutgoingMessage>,

    /// Delivered messages retained for rewinding.
    past: MessageStack,

    /// What tick each peer is on, per channel.
    session_ticks: HashMap<PeerId, TickPair>,

    /// The speculative frontier local input is tagged with.
    local_tick: Tick,
    /// The tick currently being simulated.
    present_tick: Tick,
    /// Delivery for the frame stops at this tick.
    exit_tick: Tick,

    /// Set while re-delivery of rewound messages is in progress.
    resimulate_from: Tick,
    requires_resimulation: bool,

    tick_rate: u32,
    latency: u32,

    local_id: PeerId,
    authority: PeerId,

    initialized: bool,

    events: VecDeque<SimulationEvent>,
}

impl Rollback {
    pub fn new() -> Self {
        Self {
            incoming: TickQueue::new(),
            outgoing: TickQueue::new(),
            past: MessageStack::new(1),
            session_ticks: HashMap::new(),
            local_tick: Tick::ZERO,
            present_tick: Tick::ZERO,
            exit_tick: Tick::ZERO,
            resimulate_from: Tick::ZERO,
            requires_resimulation: false,
            tick_rate: 0,
            latency: 0,
            local_id: PeerId::NONE,
            authority: PeerId::NONE,
            initialized: false,
            events: VecDeque::new(),
        }
    }

    fn latency_ticks(&self) -> u32 {
        if self.tick_rate == 0 {
            0
        } else {
            self.latency / self.tick_rate
        }
    }

    fn broadcast_next_tick(&mut self) {
        let timestamp = Timestamp::now_millis_or_zero();
        for message in next_tick_broadcasts(self.local_id, self.local_tick, timestamp) {
            self.outgoing.push(message.tick, message);
        }
    }

    /// Restore the simulation back to the given tick: retained messages
    /// from that tick onward go back into the live queue for re-delivery.
    fn rewind_to(&mut self, tick: Tick) {
        let mut count = 0;
        for message in self.past.rewind_from(tick) {
            self.incoming.push(message.tick, message);
            count += 1;
        }

        self.requires_resimulation = true;
        self.resimulate_from = tick;
        self.events
            .push_back(SimulationEvent::ResimulationRequired { from: tick });

        info!(
            "Received message from past tick {}, replaying {} message(s) over {} tick(s).",
            tick,
            count,
            self.present_tick.since(tick)
        );
    }

    fn finish_resimulation(&mut self) {
        if !self.requires_resimulation {
            return;
        }
        self.requires_resimulation = false;
        self.events.push_back(SimulationEvent::ResimulationComplete {
            from: self.resimulate_from,
            to: self.present_tick.prev(),
        });
        info!(
            "Resimulation complete, resimulated from tick {} to {}.",
            self.resimulate_from,
            self.present_tick.prev()
        );
    }

    /// Authority bootstrap, shared protocol with lockstep: adopt the
    /// session tick and compensate the local frontier for measured
    /// one-way latency.
    fn handle_cur_tick(&mut self, message: IncomingMessage) {
        if message.caller != self.authority {
            trace!(
                "Discarding session tick from {}, which is not the authority.",
                message.caller
            );
            return;
        }
        if self.initialized {
            trace!("Discarding stale session tick; already initialized.");
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

        self.local_tick = decoded.tick.advanced_by(self.latency_ticks());
        self.present_tick = decoded.tick;
        self.exit_tick = self.present_tick.next();
        self.initialized = true;

        self.broadcast_next_tick();

        // anything queued before initialization carries the sentinel tick
        for mut queued in self.outgoing.drain_tick(Tick::ZERO) {
            queued.tick = self.local_tick;
            self.outgoing.push(queued.tick, queued);
        }

        info!(
            "Received session tick value from authority of {}. Compensated for {} ms of latency, local tick is now {}.",
            decoded.tick, self.latency, self.local_tick
        );
    }
}

impl Default for Rollback {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuffer for Rollback {
    fn init_buffer(&mut self, config: &SessionConfig) {
        let latency_ticks = config.latency_ticks();
        self.tick_rate = config.tick_rate;
        self.latency = config.latency;
        self.local_id = config.local_id;
        self.authority = config.authority_id;
        self.present_tick = config.start_tick;
        self.exit_tick = self.present_tick.next();
        self.local_tick = self.present_tick.advanced_by(latency_ticks.max(1));
        self.past = MessageStack::new(((latency_ticks * 3).max(5)) as usize);
        self.initialized = config.is_authority();

        info!(
            "Rollback simulation buffer initialized with a rewind window of {} tick(s) given a latency of {} ms.",
            (latency_ticks * 3).max(5),
            self.latency
        );
        if self.initialized {
            info!(
                "Authority initialized with a local tick of {}, and a present tick of {}.",
                self.local_tick, self.present_tick
            );
        }
    }

    fn update_authority(&mut self, authority: PeerId) {
        self.authority = authority;
    }

    fn add_tick_source(&mut self, peer: PeerId) {
        if self.authority == self.local_id {
            self.session_ticks
                .insert(peer, TickPair::seeded(self.local_tick));

            let timestamp = Timestamp::now_millis_or_zero();
            let message = cur_tick_message(self.local_id, peer, self.local_tick, timestamp);
            self.outgoing.push(message.tick, message);
            info!("Sending session tick {} to {}.", self.local_tick, peer);
        } else {
            // a fellow client is roughly a round trip behind our frontier
            let start_tick = self.local_tick.rewound_by(self.latency_ticks());
            self.session_ticks.insert(peer, TickPair::seeded(start_tick));
        }
    }

    fn remove_tick_source(&mut self, peer: PeerId) {
        self.session_ticks.remove(&peer);
    }

    fn next_tick(&mut self) {
        self.local_tick = self.local_tick.next();
        self.exit_tick = self.present_tick.next();
        trace!(
            "Simulation moved to next tick. Local tick is {}, and present tick is {}.",
            self.local_tick,
            self.present_tick
        );

        if !self.initialized {
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
        message.tick = if self.initialized {
            self.local_tick
        } else {
            Tick::ZERO
        };
        self.outgoing.push(message.tick, message);
    }

    fn try_get_next_outgoing(&mut self) -> Option<OutgoingMessage> {
        if !self.initialized {
            return None;
        }
        self.outgoing.pop().map(|(_, message)| message)
    }

    fn add_incoming(&mut self, mut message: IncomingMessage) {
        if message.rpc_id.is_tick_control() {
            match message.rpc_id {
                RpcId::CUR_TICK => self.handle_cur_tick(message),
                RpcId::NEXT_TICK => {
                    if let Some(pair) = self.session_ticks.get_mut(&message.caller) {
                        pair.update(message.protocol, message.tick);
                    }
                }
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

        // a message for an already-simulated tick forces a rewind,
        // unless one is already pending from an earlier tick
        if message.tick < self.present_tick
            && (!self.requires_resimulation || message.tick < self.resimulate_from)
        {
            self.rewind_to(message.tick);
        }

        self.incoming.push(message.tick, message);
    }

    fn try_get_next_incoming(&mut self) -> Option<IncomingMessage> {
        let Some((tick, _)) = self.incoming.peek() else {
            self.present_tick = self.present_tick.next();
            self.finish_resimulation();
            return None;
        };

        self.present_tick = tick;
        if tick >= self.exit_tick {
            self.finish_resimulation();
            return None;
        }

        let (_, message) = self.incoming.pop()?;
        self.past.push(message.clone());
        Some(message)
    }

    fn poll_event(&mut self) -> Option<SimulationEvent> {
        self.events.pop_front()
    }
}

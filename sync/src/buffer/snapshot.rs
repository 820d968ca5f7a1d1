use std::collections::{HashMap, VecDeque};

use log::{info, trace, warn};

use crate::{
    buffer::{
        tick_queue::TickQueue, CatchupPolicy, SessionConfig, SimulationBuffer, SimulationEvent,
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

/// Strategy that follows the authority's clock: only the authority
/// advances its own tick, peers adopt the broadcast tick directly.
/// Delivery normally stops at one tick boundary per frame; when the
/// buffer falls too far behind the newest reported tick, boundaries are
/// skipped so buffered ticks drain faster than one per frame. No
/// correction of already-simulated state.
pub struct Snapshot {
    incoming: TickQueue<IncomingMessage>,
    outgoing: TickQueue<OutgoingMessage>,

    /// What tick each registered peer is on, per channel.
    session_ticks: HashMap<PeerId, TickPair>,

    local_tick: Tick,
    /// The tick currently being simulated.
    present_tick: Tick,
    /// Delivery for the frame stops at this tick.
    exit_tick: Tick,
    /// The newest tick every registered peer has moved past.
    last_complete_tick: Tick,
    /// The furthest tick any peer has reported.
    newest_tick: Tick,

    /// Fall this many ticks behind `newest_tick` and catch-up engages.
    catchup_window: u32,
    catchup: CatchupPolicy,
    require_catchup: bool,
    /// Boundaries skipped so far this frame.
    skipped_this_frame: u32,

    latency: u32,

    local_id: PeerId,
    authority: PeerId,

    synced: bool,

    events: VecDeque<SimulationEvent>,
}

impl Snapshot {
    pub fn new(catchup: CatchupPolicy) -> Self {
        Self {
            incoming: TickQueue::new(),
            outgoing: TickQueue::new(),
            session_ticks: HashMap::new(),
            local_tick: Tick::ZERO,
            present_tick: Tick::ZERO,
            exit_tick: Tick::ZERO,
            last_complete_tick: Tick::ZERO,
            newest_tick: Tick::ZERO,
            catchup_window: 0,
            catchup,
            require_catchup: false,
            skipped_this_frame: 0,
            latency: 0,
            local_id: PeerId::NONE,
            authority: PeerId::NONE,
            synced: false,
            events: VecDeque::new(),
        }
    }

    fn broadcast_next_tick(&mut self) {
        let timestamp = Timestamp::now_millis_or_zero();
        for message in next_tick_broadcasts(self.local_id, self.local_tick, timestamp) {
            self.outgoing.push(message.tick, message);
        }
    }

    /// Authority bootstrap: adopt the session tick as-is. The authority's
    /// clock is followed, not compensated for.
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

        self.local_tick = decoded.tick;
        self.present_tick = decoded.tick;
        self.exit_tick = self.present_tick.next();
        self.last_complete_tick = self.present_tick.prev();
        self.newest_tick = self.newest_tick.max(decoded.tick);
        self.synced = true;

        self.broadcast_next_tick();

        // anything queued before synchronization carries the sentinel tick
        for mut queued in self.outgoing.drain_tick(Tick::ZERO) {
            queued.tick = self.local_tick;
            self.outgoing.push(queued.tick, queued);
        }

        info!(
            "Received session tick value from authority of {}. Local tick is now {}.",
            decoded.tick, self.local_tick
        );
    }

    /// A peer moved to a new tick. Track the session's newest tick, mark
    /// completed ticks with a boundary, and follow the authority's clock.
    fn handle_next_tick(&mut self, message: IncomingMessage) {
        let Some(pair) = self.session_ticks.get_mut(&message.caller) else {
            return;
        };
        let prev_tick = pair.select(message.protocol);
        pair.update(message.protocol, message.tick);
        self.newest_tick = self.newest_tick.max(message.tick);

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
        }

        // adopt the authority's tick and report the move so completion
        // detection sees this peer leave its previous tick
        if message.caller == self.authority
            && self.synced
            && message.tick > self.local_tick
        {
            self.local_tick = message.tick;
            self.broadcast_next_tick();
        }

        let behind = self.newest_tick.since(self.present_tick);
        if !self.require_catchup && behind > self.catchup_window {
            self.require_catchup = true;
            self.events
                .push_back(SimulationEvent::CatchupStarted { behind });
            info!(
                "Simulation is too far behind (current simulated tick: {}, newest known tick: {}), catching up.",
                self.present_tick, self.newest_tick
            );
        }
    }

    fn clear_catchup(&mut self) {
        if self.require_catchup {
            self.require_catchup = false;
            self.events.push_back(SimulationEvent::CatchupEnded);
        }
    }
}

impl SimulationBuffer for Snapshot {
    fn init_buffer(&mut self, config: &SessionConfig) {
        let latency_ticks = config.latency_ticks();
        self.catchup_window = (latency_ticks * 3).max(5);
        self.latency = config.latency;
        self.local_id = config.local_id;
        self.authority = config.authority_id;
        self.present_tick = config.start_tick;
        self.local_tick = config.start_tick;
        self.exit_tick = self.present_tick.next();
        self.last_complete_tick = self.present_tick;
        self.newest_tick = self.present_tick;
        self.synced = config.is_authority();

        info!(
            "Snapshot simulation buffer initialized with a catch-up window of {} tick(s) given a latency of {} ms.",
            self.catchup_window, self.latency
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
        self.skipped_this_frame = 0;
        self.exit_tick = self.present_tick.next();

        // only the authority drives the session clock
        if self.authority != self.local_id {
            return;
        }
        self.local_tick = self.local_tick.next();
        self.newest_tick = self.newest_tick.max(self.local_tick);
        trace!("Simulation moved to next tick: {}.", self.local_tick);
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
        loop {
            let Some((tick, front)) = self.incoming.peek() else {
                return None;
            };

            if front.is_end_tick_marker() {
                self.incoming.pop();
                self.present_tick = self.present_tick.next().max(tick);
                self.exit_tick = self.present_tick.next();
                if self.newest_tick.since(self.present_tick) <= self.catchup_window {
                    self.clear_catchup();
                }

                // while behind, boundaries are consumed without stopping
                // the frame, pacing set by the configured policy; a drain
                // that has started keeps going for the rest of the frame
                // even once the backlog shrinks inside the window
                let draining = matches!(self.catchup, CatchupPolicy::DrainToPresent)
                    && self.skipped_this_frame > 0;
                if self.require_catchup || draining {
                    match self.catchup {
                        CatchupPolicy::OneTickPerFrame if self.skipped_this_frame > 0 => {
                            return None;
                        }
                        _ => {
                            self.skipped_this_frame += 1;
                            continue;
                        }
                    }
                }
                return None;
            }

            if tick >= self.exit_tick {
                return None;
            }

            return self.incoming.pop().map(|(_, message)| message);
        }
    }

    fn poll_event(&mut self) -> Option<SimulationEvent> {
        self.events.pop_front()
    }
}

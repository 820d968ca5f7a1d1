//! Simulation buffering: strategies that decide when a tick is safe to
//! execute and in what order buffered messages surface.

pub mod lockstep;
pub mod message_queue;
pub mod message_stack;
pub mod rollback;
pub mod snapshot;
pub mod tick_queue;

pub use lockstep::Lockstep;
pub use message_queue::MessageQueue;
pub use message_stack::MessageStack;
pub use rollback::Rollback;
pub use snapshot::Snapshot;
pub use tick_queue::TickQueue;

use crate::{
    ids::PeerId,
    messages::{IncomingMessage, OutgoingMessage},
    tick::Tick,
};

/// Session parameters handed to a buffer once they are known, typically
/// after the handshake with the session authority.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Milliseconds per simulation tick.
    pub tick_rate: u32,
    /// Estimated one-way latency to the authority, in milliseconds.
    pub latency: u32,
    /// The tick the session is currently on, received from the authority.
    pub start_tick: Tick,
    /// This connection's own identity.
    pub local_id: PeerId,
    /// The peer treated as ground truth for the session clock.
    pub authority_id: PeerId,
}

impl SessionConfig {
    /// The latency estimate expressed in whole ticks, rounded up.
    pub fn latency_ticks(&self) -> u32 {
        if self.tick_rate == 0 {
            return 0;
        }
        self.latency.div_ceil(self.tick_rate)
    }

    /// Whether this connection is the session authority.
    pub fn is_authority(&self) -> bool {
        self.local_id == self.authority_id
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50,
            latency: 0,
            start_tick: Tick::ZERO,
            local_id: PeerId::NONE,
            authority_id: PeerId::NONE,
        }
    }
}

/// How the snapshot strategy paces catch-up when it falls behind the
/// newest reported tick.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CatchupPolicy {
    /// Consume one extra tick's messages per frame until caught up.
    #[default]
    OneTickPerFrame,
    /// Drain every buffered tick in a single frame.
    DrainToPresent,
}

/// Which buffering strategy a session runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SimulationSystem {
    /// Plain FIFO delivery with no tick semantics.
    #[default]
    MessageQueue,
    /// Global tick agreement before any tick simulates.
    Lockstep,
    /// Optimistic execution corrected by rewind and resimulation.
    Rollback,
    /// Follow the authority's clock with bounded catch-up, no correction.
    Snapshot,
}

/// Strategy selection plus strategy-specific tuning, consumed when the
/// owning connection constructs its buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulationConfig {
    pub system: SimulationSystem,
    pub catchup: CatchupPolicy,
}

impl SimulationConfig {
    /// Construct the configured strategy.
    pub fn build(&self) -> Box<dyn SimulationBuffer> {
        match self.system {
            SimulationSystem::MessageQueue => Box::new(MessageQueue::new()),
            SimulationSystem::Lockstep => Box::new(Lockstep::new()),
            SimulationSystem::Rollback => Box::new(Rollback::new()),
            SimulationSystem::Snapshot => Box::new(Snapshot::new(self.catchup)),
        }
    }
}

/// Observable state changes that dependent application state needs to
/// react to, drained via [`SimulationBuffer::poll_event`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimulationEvent {
    /// Every registered peer has moved past this tick; its messages are
    /// final.
    TickComplete { tick: Tick },
    /// The buffer fell further behind the session than its window allows
    /// and is consuming ticks faster than one per frame.
    CatchupStarted { behind: u32 },
    /// The buffer is back inside its window.
    CatchupEnded,
    /// A late message invalidated already-simulated ticks; previously
    /// delivered messages from `from` onward will be re-delivered.
    /// Simulated state should rewind to just before `from`.
    ResimulationRequired { from: Tick },
    /// Re-delivery finished; the simulation is caught back up to the
    /// present.
    ResimulationComplete { from: Tick, to: Tick },
}

/// The strategy contract. Stores incoming and outgoing messages and
/// controls simulation tick behavior through the message providers used by
/// the rest of the connection.
///
/// Strategies differ only in when the present tick advances and in what
/// order buffered messages surface; the owning connection drives every
/// strategy identically:
///
/// - `init_buffer` once session parameters are known,
/// - `next_tick` once per local frame,
/// - `add_incoming` from the receive path, `add_outgoing` from the send
///   path,
/// - `try_get_next_incoming`/`try_get_next_outgoing` polled until empty
///   each frame.
///
/// The receive and consume directions must be serialized by the caller;
/// nothing here blocks.
pub trait SimulationBuffer {
    /// Provide the agreed session tick rate and local latency once known,
    /// to size the buffer. The starting tick should be received from the
    /// session authority so the simulation starts in agreement.
    fn init_buffer(&mut self, config: &SessionConfig);

    /// Hand the session-clock authority to a different peer.
    fn update_authority(&mut self, authority: PeerId);

    /// Start tracking simulation tick messages from this peer.
    fn add_tick_source(&mut self, peer: PeerId);

    /// Stop tracking simulation tick messages from this peer. Already
    /// buffered messages from the peer are not purged.
    fn remove_tick_source(&mut self, peer: PeerId);

    /// Move the simulation to the next tick. Called once per local frame.
    fn next_tick(&mut self);

    /// The tick the simulation is currently executing.
    fn present_tick(&self) -> Tick;

    /// The speculative frontier: the tick local input is being tagged with.
    fn local_tick(&self) -> Tick;

    /// Messages are currently waiting to be sent.
    fn has_outgoing(&self) -> bool;

    /// Add a new, encoded outgoing message.
    fn add_outgoing(&mut self, message: OutgoingMessage);

    /// Try to get the next outgoing message. Returns `None` once the queue
    /// is empty for this frame.
    fn try_get_next_outgoing(&mut self) -> Option<OutgoingMessage>;

    /// Add a new, decoded incoming message.
    fn add_incoming(&mut self, message: IncomingMessage);

    /// Try to get the next incoming message in delivery order. Returns
    /// `None` once delivery should stop for this frame; poll again next
    /// frame.
    fn try_get_next_incoming(&mut self) -> Option<IncomingMessage>;

    /// Drain the next observable state change, if any.
    fn poll_event(&mut self) -> Option<SimulationEvent>;
}

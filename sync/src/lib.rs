//! # Ticksync
//! Tick-synchronized message buffering for realtime multiplayer sessions.
//!
//! A session's peers exchange messages tagged with simulation ticks. The
//! [`SimulationBuffer`] strategies decide when the present tick advances
//! and in what order buffered messages surface, trading latency against
//! consistency: FIFO delivery ([`MessageQueue`]), global agreement
//! ([`Lockstep`]), optimistic execution with retroactive correction
//! ([`Rollback`]), or following the authority's clock ([`Snapshot`]).
//! [`Simulated`] properties keep per-tick value history consistent with
//! whatever tick the buffer is delivering.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod buffer;
mod ids;
mod messages;
mod simulated;
mod tick;
mod tick_pair;
mod timestamp;

pub use buffer::{
    CatchupPolicy, Lockstep, MessageQueue, MessageStack, Rollback, SessionConfig,
    SimulationBuffer, SimulationConfig, SimulationEvent, SimulationSystem, Snapshot, TickQueue,
};
pub use ids::{ObjectId, PeerId, PeerIdAllocator, RpcId};
pub use messages::{
    cur_tick_message, encode_tick_message, next_tick_broadcasts, try_decode_tick_message,
    ControlError, IncomingMessage, OutgoingMessage, Protocol, RpcPerms, TickMessage,
    TICK_MESSAGE_LENGTH,
};
pub use simulated::{Simulated, Simulator};
pub use tick::{Tick, TICK_BYTE_LENGTH};
pub use tick_pair::TickPair;
pub use timestamp::{TimeError, Timestamp};

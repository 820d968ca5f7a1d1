//! The tick control sub-protocol: `CurTick` (authority bootstrap),
//! `NextTick` (tick advancement broadcast) and `EndTick` (local frame
//! boundary). Control messages have a fixed wire layout:
//! `[RpcId:2][PeerId:4][Tick:4][Timestamp:8]`, little-endian.

use thiserror::Error;

use crate::{
    ids::{ObjectId, PeerId, RpcId, PEER_ID_BYTE_LENGTH, RPC_ID_BYTE_LENGTH},
    messages::message::{OutgoingMessage, Protocol, RpcPerms},
    tick::{Tick, TICK_BYTE_LENGTH},
};

/// Total byte length of an encoded tick control message.
pub const TICK_MESSAGE_LENGTH: usize =
    RPC_ID_BYTE_LENGTH + PEER_ID_BYTE_LENGTH + TICK_BYTE_LENGTH + 8;

/// Errors that can occur decoding a tick control message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The payload is not the fixed control message length.
    #[error("tick control message is {actual} bytes, expected {expected}")]
    UnexpectedLength { actual: usize, expected: usize },

    /// The RPC id is not one of the reserved tick control ids.
    #[error("rpc id {rpc_id} is not a tick control message")]
    NotTickControl { rpc_id: u16 },
}

/// A decoded tick control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickMessage {
    pub rpc_id: RpcId,
    pub sender: PeerId,
    pub tick: Tick,
    /// Sender wall-clock time in unix milliseconds, used to measure one-way
    /// latency on the receiving side.
    pub timestamp: i64,
}

/// Encode a tick control message into its fixed wire layout.
pub fn encode_tick_message(
    rpc_id: RpcId,
    sender: PeerId,
    tick: Tick,
    timestamp: i64,
) -> [u8; TICK_MESSAGE_LENGTH] {
    let mut bytes = [0u8; TICK_MESSAGE_LENGTH];
    let mut at = 0;
    bytes[at..at + RPC_ID_BYTE_LENGTH].copy_from_slice(&rpc_id.to_bytes());
    at += RPC_ID_BYTE_LENGTH;
    bytes[at..at + PEER_ID_BYTE_LENGTH].copy_from_slice(&sender.to_bytes());
    at += PEER_ID_BYTE_LENGTH;
    bytes[at..at + TICK_BYTE_LENGTH].copy_from_slice(&tick.to_bytes());
    at += TICK_BYTE_LENGTH;
    bytes[at..].copy_from_slice(&timestamp.to_le_bytes());
    bytes
}

/// Decode a tick control message from its fixed wire layout.
pub fn try_decode_tick_message(bytes: &[u8]) -> Result<TickMessage, ControlError> {
    if bytes.len() != TICK_MESSAGE_LENGTH {
        return Err(ControlError::UnexpectedLength {
            actual: bytes.len(),
            expected: TICK_MESSAGE_LENGTH,
        });
    }

    let mut at = 0;
    let mut rpc_bytes = [0u8; RPC_ID_BYTE_LENGTH];
    rpc_bytes.copy_from_slice(&bytes[at..at + RPC_ID_BYTE_LENGTH]);
    let rpc_id = RpcId::from_bytes(rpc_bytes);
    at += RPC_ID_BYTE_LENGTH;

    if !rpc_id.is_tick_control() {
        return Err(ControlError::NotTickControl {
            rpc_id: rpc_id.value(),
        });
    }

    let mut peer_bytes = [0u8; PEER_ID_BYTE_LENGTH];
    peer_bytes.copy_from_slice(&bytes[at..at + PEER_ID_BYTE_LENGTH]);
    let sender = PeerId::from_bytes(peer_bytes);
    at += PEER_ID_BYTE_LENGTH;

    let mut tick_bytes = [0u8; TICK_BYTE_LENGTH];
    tick_bytes.copy_from_slice(&bytes[at..at + TICK_BYTE_LENGTH]);
    let tick = Tick::from_bytes(tick_bytes);
    at += TICK_BYTE_LENGTH;

    let mut ts_bytes = [0u8; 8];
    ts_bytes.copy_from_slice(&bytes[at..]);
    let timestamp = i64::from_le_bytes(ts_bytes);

    Ok(TickMessage {
        rpc_id,
        sender,
        tick,
        timestamp,
    })
}

/// Build the pair of `NextTick` broadcasts a peer sends when its local tick
/// advances. One copy per channel; either may arrive first.
pub fn next_tick_broadcasts(caller: PeerId, tick: Tick, timestamp: i64) -> [OutgoingMessage; 2] {
    let build = |protocol| OutgoingMessage {
        tick,
        caller,
        callee: PeerId::NONE,
        rpc_id: RpcId::NEXT_TICK,
        target: ObjectId::NONE,
        protocol,
        perms: RpcPerms::AnyToAll,
        payload: encode_tick_message(RpcId::NEXT_TICK, caller, tick, timestamp).to_vec(),
    };
    [build(Protocol::Reliable), build(Protocol::Unreliable)]
}

/// Build the `CurTick` bootstrap message the authority sends to a newly
/// joined peer. Sent reliably so the bootstrap cannot be lost.
pub fn cur_tick_message(
    caller: PeerId,
    callee: PeerId,
    tick: Tick,
    timestamp: i64,
) -> OutgoingMessage {
    OutgoingMessage {
        tick,
        caller,
        callee,
        rpc_id: RpcId::CUR_TICK,
        target: ObjectId::NONE,
        protocol: Protocol::Reliable,
        perms: RpcPerms::AuthorityToClients,
        payload: encode_tick_message(RpcId::CUR_TICK, caller, tick, timestamp).to_vec(),
    }
}

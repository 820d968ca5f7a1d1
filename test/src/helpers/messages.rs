use ticksync::{
    encode_tick_message, IncomingMessage, ObjectId, OutgoingMessage, PeerId, Protocol, RpcId,
    RpcPerms, Tick,
};

/// Build an application broadcast the way a connection would hand one to
/// its buffer. The buffer tags the tick itself.
pub fn app_broadcast(caller: PeerId, payload: Vec<u8>) -> OutgoingMessage {
    OutgoingMessage {
        tick: Tick::ZERO,
        caller,
        callee: PeerId::NONE,
        rpc_id: RpcId::new(RpcId::FIRST_APP_ID),
        target: ObjectId::NONE,
        protocol: Protocol::Reliable,
        perms: RpcPerms::AnyToAll,
        payload,
    }
}

/// What the receive path hands a buffer after decoding a packet.
pub fn to_incoming(message: &OutgoingMessage) -> IncomingMessage {
    IncomingMessage {
        tick: message.tick,
        caller: message.caller,
        callee: message.callee,
        rpc_id: message.rpc_id,
        target: message.target,
        protocol: message.protocol,
        perms: message.perms,
        payload: message.payload.clone(),
    }
}

/// Build a tick control message as it would arrive off the wire, with a
/// chosen send timestamp so tests can fake measured latency.
pub fn control_incoming(
    rpc_id: RpcId,
    caller: PeerId,
    tick: Tick,
    timestamp: i64,
    protocol: Protocol,
) -> IncomingMessage {
    IncomingMessage {
        tick,
        caller,
        callee: PeerId::NONE,
        rpc_id,
        target: ObjectId::NONE,
        protocol,
        perms: RpcPerms::AnyToAll,
        payload: encode_tick_message(rpc_id, caller, tick, timestamp).to_vec(),
    }
}

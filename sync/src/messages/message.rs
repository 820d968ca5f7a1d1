use crate::{
    ids::{ObjectId, PeerId, RpcId},
    tick::Tick,
};

/// Which delivery channel a message travels on. Ticks are tracked per
/// channel because the two race each other on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Protocol {
    /// Ordered, guaranteed delivery.
    Reliable,
    /// Fire-and-forget delivery.
    Unreliable,
}

/// The permission class of an RPC, deciding who may call it and who
/// receives it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RpcPerms {
    /// Only the session authority may call; received by all clients.
    AuthorityToClients,
    /// Only clients may call; received by the authority.
    ClientsToAuthority,
    /// Only clients may call; received by other clients.
    ClientsToClients,
    /// Only clients may call; received by everyone else.
    ClientsToAll,
    /// Anyone may call; received by everyone else.
    AnyToAll,
}

/// A message that has been received and decoded by the transport layer.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    /// The simulation tick this message belongs to. Zero until a tick-aware
    /// strategy tags it.
    pub tick: Tick,
    /// Who sent the message.
    pub caller: PeerId,
    /// Who should receive the message. [`PeerId::NONE`] means everyone.
    pub callee: PeerId,
    /// The RPC this message carries arguments for.
    pub rpc_id: RpcId,
    /// The replicated object the RPC is invoked on.
    pub target: ObjectId,
    /// Which channel the message arrived on.
    pub protocol: Protocol,
    /// The permission class of the RPC.
    pub perms: RpcPerms,
    /// The decoded argument payload.
    pub payload: Vec<u8>,
}

impl IncomingMessage {
    /// A synthetic frame boundary for the given tick. Constructed locally
    /// by tick-aware strategies; never arrives off the wire.
    pub fn end_tick_marker(callee: PeerId, tick: Tick) -> Self {
        Self {
            tick,
            caller: PeerId::NONE,
            callee,
            rpc_id: RpcId::END_TICK,
            target: ObjectId::NONE,
            protocol: Protocol::Reliable,
            perms: RpcPerms::AuthorityToClients,
            payload: Vec::new(),
        }
    }

    /// Whether this message is a locally constructed frame boundary.
    pub fn is_end_tick_marker(&self) -> bool {
        self.rpc_id == RpcId::END_TICK && self.caller.is_none()
    }
}

/// A message that has been encoded and is waiting to be sent by the
/// transport layer.
#[derive(Clone, Debug)]
pub struct OutgoingMessage {
    /// The simulation tick this message was sent at. Zero is the sentinel
    /// for messages queued before the buffer synchronized with the session
    /// authority; those are retagged during bootstrap.
    pub tick: Tick,
    /// Who sent the message.
    pub caller: PeerId,
    /// Who should receive the message. [`PeerId::NONE`] means everyone.
    pub callee: PeerId,
    /// The RPC this message carries arguments for.
    pub rpc_id: RpcId,
    /// The replicated object the RPC is invoked on.
    pub target: ObjectId,
    /// Which channel to send the message on.
    pub protocol: Protocol,
    /// The permission class of the RPC.
    pub perms: RpcPerms,
    /// The encoded argument payload.
    pub payload: Vec<u8>,
}

use std::fmt;

/// Number of bytes in a [`PeerId`]'s fixed wire encoding.
pub const PEER_ID_BYTE_LENGTH: usize = 4;

/// Number of bytes in an [`RpcId`]'s fixed wire encoding.
pub const RPC_ID_BYTE_LENGTH: usize = 2;

/// Identifies a session participant.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PeerId(u32);

impl PeerId {
    /// The absent peer. As a caller this means the message came from the
    /// session authority's own machinery; as a callee it means broadcast.
    pub const NONE: PeerId = PeerId(0);

    pub fn new(id: u32) -> Self {
        PeerId(id)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn to_bytes(self) -> [u8; PEER_ID_BYTE_LENGTH] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; PEER_ID_BYTE_LENGTH]) -> Self {
        PeerId(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "<PeerId: None>")
        } else {
            write!(f, "<PeerId: {}>", self.0)
        }
    }
}

/// Identifies a replicated object targeted by a message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Messages with no object target, such as the tick control messages.
    pub const NONE: ObjectId = ObjectId(0);

    pub fn new(id: u32) -> Self {
        ObjectId(id)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "<ObjectId: None>")
        } else {
            write!(f, "<ObjectId: {}>", self.0)
        }
    }
}

/// Identifies which remote procedure a message carries arguments for.
/// Ids below [`RpcId::FIRST_APP_ID`] are reserved for the protocol itself.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RpcId(u16);

impl RpcId {
    /// Broadcast by a peer when its local simulation moves to a new tick.
    pub const NEXT_TICK: RpcId = RpcId(9);
    /// Sent by the session authority to bootstrap a newly joined peer's
    /// simulation clock.
    pub const CUR_TICK: RpcId = RpcId(10);
    /// Synthetic frame boundary marker. Constructed locally by tick-aware
    /// strategies, never sent over the wire.
    pub const END_TICK: RpcId = RpcId(11);

    /// The first id available to application RPCs.
    pub const FIRST_APP_ID: u16 = 30;

    pub fn new(id: u16) -> Self {
        RpcId(id)
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Whether this id belongs to the tick control sub-protocol.
    pub fn is_tick_control(self) -> bool {
        self == Self::NEXT_TICK || self == Self::CUR_TICK || self == Self::END_TICK
    }

    pub fn to_bytes(self) -> [u8; RPC_ID_BYTE_LENGTH] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; RPC_ID_BYTE_LENGTH]) -> Self {
        RpcId(u16::from_le_bytes(bytes))
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NEXT_TICK => write!(f, "<RpcId: NextTick>"),
            Self::CUR_TICK => write!(f, "<RpcId: CurTick>"),
            Self::END_TICK => write!(f, "<RpcId: EndTick>"),
            _ => write!(f, "<RpcId: {}>", self.0),
        }
    }
}

/// Hands out peer ids for one session. Owned by the session so that two
/// sessions in the same process never collide. Id zero is reserved for
/// [`PeerId::NONE`].
#[derive(Debug)]
pub struct PeerIdAllocator {
    next: u32,
}

impl PeerIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> PeerId {
        let id = PeerId::new(self.next);
        self.next += 1;
        id
    }
}

impl Default for PeerIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

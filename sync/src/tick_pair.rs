use crate::{messages::Protocol, tick::Tick};

/// The latest known tick for a single peer, tracked separately per delivery
/// channel. Reliable and unreliable deliveries race each other on the wire,
/// so the two channels can legitimately disagree about how far a peer has
/// advanced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TickPair {
    reliable: Tick,
    unreliable: Tick,
}

impl TickPair {
    pub fn new(reliable: Tick, unreliable: Tick) -> Self {
        Self {
            reliable,
            unreliable,
        }
    }

    /// Seed both channels with the same starting tick.
    pub fn seeded(start: Tick) -> Self {
        Self::new(start, start)
    }

    /// The latest known tick on the given channel.
    pub fn select(&self, protocol: Protocol) -> Tick {
        match protocol {
            Protocol::Reliable => self.reliable,
            Protocol::Unreliable => self.unreliable,
        }
    }

    /// Record a newer tick for the given channel. Latest wins; an update
    /// never regresses a channel.
    pub fn update(&mut self, protocol: Protocol, tick: Tick) {
        let slot = match protocol {
            Protocol::Reliable => &mut self.reliable,
            Protocol::Unreliable => &mut self.unreliable,
        };
        if tick > *slot {
            *slot = tick;
        }
    }

    /// The tick this peer has definitely reached on both channels.
    pub fn min(&self) -> Tick {
        self.reliable.min(self.unreliable)
    }

    /// The furthest tick this peer has reported on either channel.
    pub fn max(&self) -> Tick {
        self.reliable.max(self.unreliable)
    }
}

use std::fmt;

/// Number of bytes in a [`Tick`]'s fixed wire encoding.
pub const TICK_BYTE_LENGTH: usize = 4;

/// The integer id of a single simulation tick. Ticks are the unit of
/// ordering for replicated state: every buffered message belongs to exactly
/// one tick, and strategies decide when a tick's messages may be delivered.
///
/// Comparison is plain unsigned comparison, not wraparound-aware. At
/// realistic tick rates a session would need to run for over two years to
/// approach the u32 boundary, so values are assumed to stay far from it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tick(u32);

impl Tick {
    /// Tick zero. Also used as the sentinel tag on outgoing messages queued
    /// before a buffer has synchronized with the session authority.
    pub const ZERO: Tick = Tick(0);

    pub fn new(value: u32) -> Self {
        Tick(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The following tick. Wraps at the u32 boundary.
    pub fn next(self) -> Self {
        Tick(self.0.wrapping_add(1))
    }

    /// The preceding tick, saturating at zero.
    pub fn prev(self) -> Self {
        Tick(self.0.saturating_sub(1))
    }

    /// This tick advanced by the given number of ticks.
    pub fn advanced_by(self, ticks: u32) -> Self {
        Tick(self.0.wrapping_add(ticks))
    }

    /// This tick rewound by the given number of ticks, saturating at zero.
    pub fn rewound_by(self, ticks: u32) -> Self {
        Tick(self.0.saturating_sub(ticks))
    }

    /// How many ticks ahead of `earlier` this tick is. Zero if `earlier` is
    /// not actually earlier.
    pub fn since(self, earlier: Tick) -> u32 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn to_bytes(self) -> [u8; TICK_BYTE_LENGTH] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; TICK_BYTE_LENGTH]) -> Self {
        Tick(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Tick: {}>", self.0)
    }
}

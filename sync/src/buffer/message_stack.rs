use std::collections::VecDeque;

use crate::{messages::IncomingMessage, tick::Tick};

/// Bounded history of delivered messages, grouped by tick. The rollback
/// strategy pushes every message it delivers, then pulls a suffix of the
/// history back out when a late arrival forces resimulation.
///
/// Capacity bounds the number of distinct retained ticks; pushing a message
/// for a newer tick than all retained evicts the oldest tick and every
/// message belonging to it.
pub struct MessageStack {
    groups: VecDeque<(Tick, Vec<IncomingMessage>)>,
    capacity: usize,
    newest_tick: Tick,
}

impl MessageStack {
    /// A stack retaining at most `capacity` distinct ticks. There can be
    /// any number of messages per tick.
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: VecDeque::new(),
            capacity: capacity.max(1),
            newest_tick: Tick::ZERO,
        }
    }

    /// The newest tick with retained history.
    pub fn newest_tick(&self) -> Tick {
        self.newest_tick
    }

    /// The oldest tick with retained history, if any.
    pub fn oldest_tick(&self) -> Option<Tick> {
        self.groups.front().map(|(tick, _)| *tick)
    }

    pub fn message_count(&self) -> usize {
        self.groups.iter().map(|(_, msgs)| msgs.len()).sum()
    }

    /// Record a delivered message. Messages arrive in delivery order, so a
    /// tick newer than all retained opens a new group (evicting the oldest
    /// at capacity); anything else appends to the current group.
    pub fn push(&mut self, message: IncomingMessage) {
        let tick = message.tick;
        if self.groups.is_empty() || tick > self.newest_tick {
            self.groups.push_back((tick, vec![message]));
            self.newest_tick = tick;
            if self.groups.len() > self.capacity {
                self.groups.pop_front();
            }
        } else if let Some((_, messages)) = self.groups.back_mut() {
            messages.push(message);
        }
    }

    /// Remove and return every retained message from the given tick to the
    /// present, in original delivery order, and roll the newest retained
    /// tick back to just before it. Ticks older than retained history are
    /// simply not part of the result; a rewind point older than the whole
    /// window replays everything that is still retained.
    pub fn rewind_from(&mut self, tick: Tick) -> Vec<IncomingMessage> {
        if self.groups.is_empty() || tick > self.newest_tick {
            return Vec::new();
        }

        let split = self
            .groups
            .iter()
            .position(|(group_tick, _)| *group_tick >= tick)
            .unwrap_or(self.groups.len());

        let mut rewound = Vec::new();
        for (_, mut messages) in self.groups.split_off(split) {
            rewound.append(&mut messages);
        }
        self.newest_tick = tick.prev();
        rewound
    }
}

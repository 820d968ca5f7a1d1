//! Property tests for the tick arithmetic and ordering primitives the
//! strategies are built on.

use proptest::prelude::*;
use ticksync::{try_decode_tick_message, Tick, TickQueue, TICK_MESSAGE_LENGTH};

proptest! {
    #[test]
    fn byte_encoding_round_trips(value in any::<u32>()) {
        let tick = Tick::new(value);
        prop_assert_eq!(Tick::from_bytes(tick.to_bytes()), tick);
    }

    #[test]
    fn advancing_then_measuring_is_consistent(
        value in 0u32..(u32::MAX / 2),
        steps in 0u32..(u32::MAX / 2),
    ) {
        let tick = Tick::new(value);
        prop_assert_eq!(tick.advanced_by(steps).since(tick), steps);
    }

    #[test]
    fn queue_orders_by_tick_with_stable_ties(ticks in prop::collection::vec(0u32..8, 1..64)) {
        let mut queue = TickQueue::new();
        for (index, tick) in ticks.iter().enumerate() {
            queue.push(Tick::new(*tick), index);
        }

        let mut popped = Vec::new();
        while let Some(entry) = queue.pop() {
            popped.push(entry);
        }
        prop_assert_eq!(popped.len(), ticks.len());
        for window in popped.windows(2) {
            prop_assert!(window[0].0 <= window[1].0);
            // same tick: original arrival order survives
            if window[0].0 == window[1].0 {
                prop_assert!(window[0].1 < window[1].1);
            }
        }
    }

    #[test]
    fn decoder_rejects_any_wrong_length(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(bytes.len() != TICK_MESSAGE_LENGTH);
        prop_assert!(try_decode_tick_message(&bytes).is_err());
    }
}

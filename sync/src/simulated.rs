use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use crate::tick::Tick;

/// Receives resimulation notices fanned out by a [`Simulator`].
trait Resimulate {
    fn on_resimulation(&mut self, rewind_to: Tick);
}

/// Owns the shared present tick and fans resimulation notices out to
/// registered [`Simulated`] properties.
///
/// The owning connection drives it: copy the buffer's present tick in
/// with [`Simulator::set_present_tick`] each frame, and forward a
/// resimulation event's rewind point to [`Simulator::resimulate_from`].
pub struct Simulator {
    present: Rc<Cell<Tick>>,
    simulated: RefCell<Vec<Weak<RefCell<dyn Resimulate>>>>,
    capacity: usize,
}

impl Simulator {
    /// `capacity` is how many ticks of history each registered property
    /// retains.
    pub fn new(capacity: usize) -> Self {
        Self {
            present: Rc::new(Cell::new(Tick::ZERO)),
            simulated: RefCell::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn present_tick(&self) -> Tick {
        self.present.get()
    }

    pub fn set_present_tick(&self, tick: Tick) {
        self.present.set(tick);
    }

    /// Create a simulated property seeded with `initial` at the present
    /// tick. Dropping the returned handle unregisters it.
    pub fn register<T: Clone + 'static>(&self, initial: T) -> Simulated<T> {
        let inner = Rc::new(RefCell::new(SimulatedInner {
            values: vec![initial; self.capacity],
            newest_tick: self.present.get(),
            first_tick: self.present.get(),
            present: Rc::clone(&self.present),
        }));
        let erased: Rc<RefCell<dyn Resimulate>> = inner.clone();
        self.simulated.borrow_mut().push(Rc::downgrade(&erased));
        Simulated { inner }
    }

    /// Roll every registered property back to just before `rewind_to`.
    /// Dropped properties are pruned as a side effect.
    pub fn resimulate_from(&self, rewind_to: Tick) {
        self.simulated.borrow_mut().retain(|weak| {
            if let Some(simulated) = weak.upgrade() {
                simulated.borrow_mut().on_resimulation(rewind_to);
                true
            } else {
                false
            }
        });
    }

    /// How many live properties are registered.
    pub fn simulated_count(&self) -> usize {
        self.simulated
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

struct SimulatedInner<T> {
    /// Circular per-tick history, indexed by tick modulo capacity.
    values: Vec<T>,
    newest_tick: Tick,
    first_tick: Tick,
    present: Rc<Cell<Tick>>,
}

impl<T: Clone> SimulatedInner<T> {
    fn capacity(&self) -> u32 {
        self.values.len() as u32
    }

    fn slot(&self, tick: Tick) -> usize {
        (tick.value() % self.capacity()) as usize
    }

    /// The oldest tick still covered by retained history.
    fn oldest_tick(&self) -> Tick {
        self.newest_tick
            .rewound_by(self.capacity() - 1)
            .max(self.first_tick)
    }

    /// Reads clamp into the retained window: the newest recorded value
    /// when the present is ahead of history, the oldest when it is
    /// further back than the window covers.
    fn value_at(&self, tick: Tick) -> T {
        if self.newest_tick < tick {
            self.values[self.slot(self.newest_tick)].clone()
        // a tick exactly `capacity` back shares the newest tick's slot
        // and reads its value
        } else if self.newest_tick.since(tick) > self.capacity() {
            self.values[self.slot(self.oldest_tick())].clone()
        } else {
            self.values[self.slot(tick)].clone()
        }
    }

    /// Writes hold state steady across skipped ticks: every slot between
    /// the last recorded tick and the present is filled with the previous
    /// value before the new one lands.
    fn set(&mut self, value: T) {
        let present = self.present.get();
        if self.newest_tick < present {
            let held = self.values[self.slot(self.newest_tick)].clone();
            let mut tick = self.newest_tick;
            while tick < present {
                let slot = self.slot(tick);
                self.values[slot] = held.clone();
                tick = tick.next();
            }
            self.newest_tick = present;
        }
        let slot = self.slot(present);
        self.values[slot] = value;
    }
}

impl<T: Clone> Resimulate for SimulatedInner<T> {
    /// Rolls the newest-recorded pointer back so subsequent writes
    /// overwrite the formerly speculative entries in place.
    fn on_resimulation(&mut self, rewind_to: Tick) {
        let target = rewind_to.prev();
        if self.newest_tick < target {
            return;
        }
        if self.newest_tick.since(target) > self.capacity() {
            self.newest_tick = self.oldest_tick();
        } else {
            self.newest_tick = target;
        }
    }
}

/// A per-tick value history attached to a [`Simulator`]. Reads resolve
/// to the value recorded for the simulator's present tick, so state
/// stays consistent with whichever tick the buffer is delivering, and
/// resimulation rolls speculative values back automatically.
pub struct Simulated<T: Clone> {
    inner: Rc<RefCell<SimulatedInner<T>>>,
}

impl<T: Clone> Simulated<T> {
    /// The value at the simulator's present tick.
    pub fn get(&self) -> T {
        let inner = self.inner.borrow();
        let present = inner.present.get();
        inner.value_at(present)
    }

    /// Record a value at the simulator's present tick.
    pub fn set(&mut self, value: T) {
        self.inner.borrow_mut().set(value);
    }

    /// The value recorded for the given tick, clamped to retained
    /// history.
    pub fn value_at(&self, tick: Tick) -> T {
        self.inner.borrow().value_at(tick)
    }
}

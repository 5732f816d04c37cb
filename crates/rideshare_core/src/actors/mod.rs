//! The three simulation actors and their shared plumbing.
//!
//! Each actor owns its object maps outright and runs one tick thread. What
//! other threads may see is published explicitly: pending handoffs go
//! through mutex-guarded [`SharedMap`]s drained by the owner, and read-only
//! snapshots are republished at the end of every tick for the matcher and
//! the map reader. A disappearing snapshot entry is normal; readers just
//! skip it.

pub mod passenger_queue;
pub mod ride_matcher;
pub mod vehicle_manager;

pub use passenger_queue::PassengerQueue;
pub use ride_matcher::RideMatcher;
pub use vehicle_manager::VehicleManager;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::map::Coordinate;
use crate::objects::{Color, ObjectId, PassengerStatus, VehicleState};

/// Nominal duration of one actor tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// A mutex-guarded id-keyed map, used both for pending handoffs
/// (insert + drain) and for published snapshots (replace + get).
pub struct SharedMap<T> {
    entries: Mutex<HashMap<ObjectId, T>>,
}

impl<T: Clone> SharedMap<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObjectId, T>> {
        self.entries.lock().expect("shared map mutex poisoned")
    }

    pub fn insert(&self, id: ObjectId, value: T) {
        self.lock().insert(id, value);
    }

    /// Take the whole contents, leaving the map empty. The copy-and-clear
    /// drain: the lock is released before the entries are acted on.
    pub fn drain(&self) -> HashMap<ObjectId, T> {
        std::mem::take(&mut *self.lock())
    }

    /// Swap in a freshly built snapshot.
    pub fn replace(&self, entries: HashMap<ObjectId, T>) {
        *self.lock() = entries;
    }

    pub fn get(&self, id: ObjectId) -> Option<T> {
        self.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T: Clone> Default for SharedMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a queue-owned passenger, republished every tick.
#[derive(Debug, Clone)]
pub struct PassengerSnapshot {
    pub id: ObjectId,
    pub position: Coordinate,
    pub destination: Coordinate,
    pub status: PassengerStatus,
    pub color: Color,
}

/// Read-only view of a manager-owned vehicle, republished every tick.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub id: ObjectId,
    pub position: Coordinate,
    pub destination: Coordinate,
    pub state: VehicleState,
    pub color: Color,
    pub passenger: Option<ObjectId>,
}

//! Asynchronous messages between the simulation actors.
//!
//! Actors never call into each other from their tick loops; they post
//! messages into the recipient's [`Inbox`] and read their own on the next
//! tick. Each inbox drains with a copy-and-clear under its mutex so the
//! lock is released before any message is acted on.

use std::sync::Mutex;

use crate::map::Coordinate;
use crate::objects::{ObjectId, Passenger};

/// Messages handled by the passenger queue.
#[derive(Debug, Clone)]
pub enum PassengerQueueMessage {
    /// A vehicle was matched and is on its way.
    RideOnWay { id: ObjectId },
    /// The matched vehicle is waiting at the pickup node.
    RideArrived { id: ObjectId },
    /// The passenger has boarded; drop them from the walking map.
    PassengerPickedUp { id: ObjectId },
    /// The passenger could not be served this time.
    PassengerFailure { id: ObjectId },
}

/// Messages handled by the ride matcher.
#[derive(Debug, Clone)]
pub enum RideMatcherMessage {
    /// A waiting passenger wants a vehicle. Waiting passengers do not move,
    /// so their position rides along for the matching policies.
    PassengerRequestsRide { id: ObjectId, position: Coordinate },
    /// An idle vehicle wants a passenger.
    VehicleRequestsPassenger { id: ObjectId },
    /// Routing to the matched passenger's pickup node failed.
    VehicleCannotReachPassenger { id: ObjectId },
    /// The vehicle reached the pickup node and is waiting.
    VehicleHasArrived { id: ObjectId },
    /// The passenger walked to the vehicle; hand them over for pickup.
    PassengerToVehicle { id: ObjectId, passenger: Passenger },
    /// The passenger left the simulation.
    PassengerIsIneligible { id: ObjectId },
    /// The vehicle left the simulation.
    VehicleIsIneligible { id: ObjectId },
}

/// A per-recipient mailbox, postable from any thread.
pub struct Inbox<M> {
    messages: Mutex<Vec<M>>,
}

impl<M> Inbox<M> {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Append a message. A leaf operation: the lock is held only for the
    /// push.
    pub fn post(&self, message: M) {
        self.messages
            .lock()
            .expect("inbox mutex poisoned")
            .push(message);
    }

    /// Take every queued message in insertion order, leaving the inbox
    /// empty.
    pub fn drain(&self) -> Vec<M> {
        std::mem::take(&mut *self.messages.lock().expect("inbox mutex poisoned"))
    }
}

impl<M> Default for Inbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

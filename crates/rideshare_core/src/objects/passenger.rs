//! Passengers: request rides while waiting, then walk to the arrived vehicle.

use crate::map::Coordinate;
use crate::objects::{Color, MapObject, ObjectId, Routable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassengerStatus {
    NoRideRequested,
    RideRequested,
    Walking,
    AtRide,
}

#[derive(Debug, Clone)]
pub struct Passenger {
    pub obj: MapObject,
    pub status: PassengerStatus,
    /// Node the passenger walks to once their vehicle arrives. Set on the
    /// transition to [`PassengerStatus::Walking`].
    pub walk_to_pos: Option<Coordinate>,
}

impl Passenger {
    pub fn new(
        id: ObjectId,
        position: Coordinate,
        destination: Coordinate,
        color: Color,
        distance_per_cycle: f64,
    ) -> Self {
        Self {
            obj: MapObject::new(id, position, destination, color, distance_per_cycle),
            status: PassengerStatus::NoRideRequested,
            walk_to_pos: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.obj.id
    }

    /// Start walking toward the arrived vehicle's node.
    pub fn begin_walking(&mut self, walk_to: Coordinate) {
        self.walk_to_pos = Some(walk_to);
        self.status = PassengerStatus::Walking;
    }

    /// One walking step toward `walk_to_pos`: snap and become
    /// [`PassengerStatus::AtRide`] when within a single step, otherwise
    /// advance by at most one `distance_per_cycle`. Returns true on the tick
    /// the passenger arrives.
    pub fn walk_step(&mut self) -> bool {
        let target = self
            .walk_to_pos
            .expect("walking passenger without a walk-to position");
        let distance = self.obj.position.distance(target);
        if distance <= self.obj.distance_per_cycle {
            self.obj.position = target;
            self.status = PassengerStatus::AtRide;
            true
        } else {
            self.obj.position = self.obj.step_toward(target);
            false
        }
    }

    /// Copy for a message payload or snapshot; the route path stays with the
    /// queue-owned original.
    pub fn without_path(&self) -> Passenger {
        let mut copy = self.clone();
        copy.obj.path.clear();
        copy
    }
}

impl Routable for Passenger {
    fn position(&self) -> Coordinate {
        self.obj.position
    }

    fn destination(&self) -> Coordinate {
        self.obj.destination
    }

    fn set_path(&mut self, path: Vec<Coordinate>) {
        self.obj.path = path;
    }
}

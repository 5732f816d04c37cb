//! Map objects: the state shared by passengers and vehicles, and the
//! [`Routable`] seam the route planner writes paths through.

pub mod passenger;
pub mod vehicle;

pub use passenger::{Passenger, PassengerStatus};
pub use vehicle::{Vehicle, VehicleState};

use rand::Rng;

use crate::map::Coordinate;

/// Monotonic per-manager object id.
pub type ObjectId = u64;

/// Unreachable-destination events tolerated before an object is evicted.
pub const MAX_FAILURES: u32 = 10;

/// Display colour triple. Carried through snapshots for the map reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub fn random<R: Rng>(rng: &mut R) -> Color {
        Color {
            red: rng.gen_range(0..=255),
            green: rng.gen_range(0..=255),
            blue: rng.gen_range(0..=255),
        }
    }
}

/// State common to every object on the map. Passengers and vehicles compose
/// this rather than inherit it.
#[derive(Debug, Clone)]
pub struct MapObject {
    pub id: ObjectId,
    pub color: Color,
    pub position: Coordinate,
    pub destination: Coordinate,
    /// Node positions from start to destination, written by the planner.
    /// Empty means no route has been found.
    pub path: Vec<Coordinate>,
    pub failures: u32,
    /// Maximum Euclidean step per tick, derived from the map's latitude span.
    pub distance_per_cycle: f64,
}

impl MapObject {
    pub fn new(
        id: ObjectId,
        position: Coordinate,
        destination: Coordinate,
        color: Color,
        distance_per_cycle: f64,
    ) -> Self {
        Self {
            id,
            color,
            position,
            destination,
            path: Vec::new(),
            failures: 0,
            distance_per_cycle,
        }
    }

    /// Count one unreachable event. Returns true once the cap is reached and
    /// the object should leave the simulation.
    pub fn movement_failure(&mut self) -> bool {
        self.failures += 1;
        self.failures >= MAX_FAILURES
    }

    /// Intermediate position one full step along the heading to `target`.
    /// Only meaningful when `target` is farther than one step away.
    pub(crate) fn step_toward(&self, target: Coordinate) -> Coordinate {
        let heading = (target.y - self.position.y).atan2(target.x - self.position.x);
        Coordinate {
            x: self.position.x + self.distance_per_cycle * heading.cos(),
            y: self.position.y + self.distance_per_cycle * heading.sin(),
        }
    }
}

/// What the planner needs from a map object: where it is, where it is going,
/// and somewhere to write the resulting path.
pub trait Routable {
    fn position(&self) -> Coordinate;
    fn destination(&self) -> Coordinate;
    fn set_path(&mut self, path: Vec<Coordinate>);
}

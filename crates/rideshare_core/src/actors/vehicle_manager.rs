//! Vehicle manager actor: generates the fleet and drives it. Idle vehicles
//! cruise until matched, drive to their pickup, deliver the passenger, and
//! leave the map if they get stuck too often.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::actors::{SharedMap, VehicleSnapshot, TICK_INTERVAL};
use crate::config::SimulationConfig;
use crate::console::Console;
use crate::map::{Coordinate, RouteModel};
use crate::messages::{Inbox, RideMatcherMessage};
use crate::objects::{Color, ObjectId, Passenger, Vehicle, VehicleState};
use crate::routing::RoutePlanner;

pub struct VehicleManager {
    model: Arc<RouteModel>,
    planner: Arc<RoutePlanner>,
    console: Arc<Console>,
    matcher: Arc<Inbox<RideMatcherMessage>>,
    /// Pickup locations assigned by the matcher, drained each tick.
    assignments: Arc<SharedMap<Coordinate>>,
    /// Passengers ready to board, posted by the matcher, drained each tick.
    pickups: Arc<SharedMap<Passenger>>,
    vehicles_view: Arc<SharedMap<VehicleSnapshot>>,
    /// The fleet, keyed by id. Owned by this actor.
    vehicles: HashMap<ObjectId, Vehicle>,
    /// Vehicles that hit the failure cap this tick. They stay in the fleet
    /// and keep driving until the removal pass at the end of the tick.
    to_remove: Vec<ObjectId>,
    next_id: ObjectId,
    max_objects: usize,
    rng: StdRng,
}

impl VehicleManager {
    /// Build the manager and generate the full fleet.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: Arc<RouteModel>,
        planner: Arc<RoutePlanner>,
        console: Arc<Console>,
        matcher: Arc<Inbox<RideMatcherMessage>>,
        assignments: Arc<SharedMap<Coordinate>>,
        pickups: Arc<SharedMap<Passenger>>,
        vehicles_view: Arc<SharedMap<VehicleSnapshot>>,
        config: &SimulationConfig,
        seed: u64,
    ) -> Self {
        let mut manager = Self {
            model,
            planner,
            console,
            matcher,
            assignments,
            pickups,
            vehicles_view,
            vehicles: HashMap::new(),
            to_remove: Vec::new(),
            next_id: 0,
            max_objects: config.max_vehicles,
            rng: StdRng::seed_from_u64(seed),
        };
        for _ in 0..manager.max_objects {
            manager.generate_new();
        }
        manager.publish_view();
        manager
    }

    /// Run the drive loop on its own thread, forever.
    pub fn start(mut self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("vehicle-manager".into())
            .spawn(move || loop {
                thread::sleep(TICK_INTERVAL);
                self.tick();
            })
    }

    pub(crate) fn tick(&mut self) {
        self.pick_up_passengers();
        self.new_passenger_assignments();
        self.drive_vehicles();
        self.apply_removals();
        if self.vehicles.len() < self.max_objects {
            self.generate_new();
        }
        self.publish_view();
    }

    /// New vehicle at the road node nearest a random position, cruising
    /// toward another random position until it gets a passenger.
    fn generate_new(&mut self) {
        let start = self.model.random_position(&mut self.rng);
        let destination = self.model.random_position(&mut self.rng);
        let nearest_start = self.model.node(self.model.find_closest_node(start));
        let nearest_dest = self.model.node(self.model.find_closest_node(destination));
        let color = Color::random(&mut self.rng);

        let id = self.next_id;
        self.next_id += 1;
        let vehicle = Vehicle::new(
            id,
            nearest_start,
            nearest_dest,
            color,
            self.model.distance_per_cycle(),
        );
        self.console.line(format!(
            "Vehicle #{id} now driving from: {}, {}.",
            nearest_start.y, nearest_start.x
        ));
        self.vehicles.insert(id, vehicle);
    }

    /// Install passengers the matcher handed over, and head for their
    /// destinations.
    fn pick_up_passengers(&mut self) {
        for (id, passenger) in self.pickups.drain() {
            let mut vehicle = self
                .vehicles
                .remove(&id)
                .expect("pickup for unknown vehicle");
            self.console.line(format!(
                "Vehicle #{id} picked up Passenger #{}.",
                passenger.id()
            ));
            vehicle.set_passenger(passenger);
            self.reset_vehicle_destination(&mut vehicle, false);
            vehicle.state = VehicleState::DrivingPassenger;
            self.vehicles.insert(id, vehicle);
        }
    }

    /// Route newly matched vehicles to their pickup locations. A failed
    /// vehicle stays in the fleet; if the failure tripped the cap it leaves
    /// in this tick's removal pass, after the drive loop.
    fn new_passenger_assignments(&mut self) {
        for (id, pickup) in self.assignments.drain() {
            let Some(mut vehicle) = self.vehicles.remove(&id) else {
                // Removals happen at the end of a tick and assignments are
                // drained at the start, so the vehicle can only be missing
                // when the matcher committed just before a previous tick
                // evicted it. That eviction already freed the passenger.
                log::warn!("dropping assignment for vehicle #{id}, no longer on the map");
                continue;
            };
            self.assign_one(&mut vehicle, pickup);
            self.vehicles.insert(id, vehicle);
        }
    }

    /// Compute the route to a pickup while keeping the vehicle's visible
    /// position. Routing starts from the next node on the current path, not
    /// the raw position, so a mid-segment vehicle starts from a node known
    /// to be routable.
    fn assign_one(&mut self, vehicle: &mut Vehicle, pickup: Coordinate) {
        let current_pos = vehicle.obj.position;
        let Some(&next_node) = vehicle.obj.path.get(vehicle.path_index) else {
            // No usable path to resume from; treat as unreachable.
            self.assignment_failure(vehicle);
            return;
        };
        vehicle.set_position(next_node);
        vehicle.set_destination(pickup);
        self.reset_vehicle_destination(vehicle, false);
        self.planner.a_star_search(vehicle);
        vehicle.set_position(current_pos);

        if vehicle.obj.path.is_empty() {
            self.assignment_failure(vehicle);
        } else {
            vehicle.state = VehicleState::PassengerQueued;
        }
    }

    fn assignment_failure(&mut self, vehicle: &mut Vehicle) {
        self.matcher
            .post(RideMatcherMessage::VehicleCannotReachPassenger { id: vehicle.id() });
        vehicle.state = VehicleState::NoPassengerRequested;
        self.simple_vehicle_failure(vehicle);
    }

    fn drive_vehicles(&mut self) {
        let ids: Vec<ObjectId> = self.vehicles.keys().copied().collect();
        for id in ids {
            let mut vehicle = self
                .vehicles
                .remove(&id)
                .expect("vehicle disappeared mid-tick");
            self.drive_one(&mut vehicle);
            self.vehicles.insert(id, vehicle);
        }
    }

    /// Erase the vehicles that hit the failure cap this tick, telling the
    /// matcher first so matched passengers are freed.
    fn apply_removals(&mut self) {
        for id in std::mem::take(&mut self.to_remove) {
            self.matcher
                .post(RideMatcherMessage::VehicleIsIneligible { id });
            self.vehicles.remove(&id);
        }
    }

    /// One tick of one vehicle.
    fn drive_one(&mut self, vehicle: &mut Vehicle) {
        if vehicle.obj.path.is_empty() {
            self.planner.a_star_search(vehicle);
            if vehicle.obj.path.is_empty()
                && matches!(
                    vehicle.state,
                    VehicleState::NoPassengerRequested | VehicleState::NoPassengerQueued
                )
            {
                // A stuck vehicle with a passenger queued keeps retrying;
                // only idle cruising counts toward eviction here.
                self.simple_vehicle_failure(vehicle);
                return;
            }
        }

        if vehicle.state == VehicleState::NoPassengerRequested {
            self.request_passenger(vehicle);
        }

        if vehicle.state == VehicleState::Waiting {
            return;
        }
        vehicle.incremental_move();

        if vehicle.at_destination() {
            match vehicle.state {
                VehicleState::NoPassengerQueued => self.reset_vehicle_destination(vehicle, true),
                VehicleState::PassengerQueued => self.arrived_at_passenger(vehicle),
                VehicleState::DrivingPassenger => self.drop_off_passenger(vehicle),
                _ => {}
            }
        }
    }

    /// Count one unreachable event; mark the vehicle for removal at the
    /// cap, otherwise try a new random destination.
    fn simple_vehicle_failure(&mut self, vehicle: &mut Vehicle) {
        if vehicle.obj.movement_failure() {
            self.to_remove.push(vehicle.id());
            self.console
                .line(format!("Vehicle #{} is stuck, leaving map.", vehicle.id()));
        } else {
            self.reset_vehicle_destination(vehicle, true);
        }
    }

    fn request_passenger(&mut self, vehicle: &mut Vehicle) {
        // State first, so a prompt reply never races the transition.
        vehicle.state = VehicleState::NoPassengerQueued;
        self.matcher
            .post(RideMatcherMessage::VehicleRequestsPassenger { id: vehicle.id() });
    }

    fn arrived_at_passenger(&mut self, vehicle: &mut Vehicle) {
        vehicle.state = VehicleState::Waiting;
        self.matcher
            .post(RideMatcherMessage::VehicleHasArrived { id: vehicle.id() });
    }

    fn drop_off_passenger(&mut self, vehicle: &mut Vehicle) {
        let passenger = vehicle
            .drop_off_passenger()
            .expect("drop-off without a passenger aboard");
        self.console.line(format!(
            "Vehicle #{} dropped off Passenger #{}.",
            vehicle.id(),
            passenger.id()
        ));
        self.reset_vehicle_destination(vehicle, true);
        vehicle.state = VehicleState::NoPassengerRequested;
    }

    /// Retarget the vehicle onto a road node: either a fresh random
    /// position, or the current destination snapped onto the network.
    fn reset_vehicle_destination(&mut self, vehicle: &mut Vehicle, random: bool) {
        let destination = if random {
            self.model.random_position(&mut self.rng)
        } else {
            vehicle.obj.destination
        };
        let nearest = self.model.node(self.model.find_closest_node(destination));
        vehicle.set_destination(nearest);
    }

    fn publish_view(&self) {
        let view: HashMap<ObjectId, VehicleSnapshot> = self
            .vehicles
            .iter()
            .map(|(&id, vehicle)| {
                (
                    id,
                    VehicleSnapshot {
                        id,
                        position: vehicle.obj.position,
                        destination: vehicle.obj.destination,
                        state: vehicle.state,
                        color: vehicle.obj.color,
                        passenger: vehicle.passenger.as_ref().map(|p| p.id()),
                    },
                )
            })
            .collect();
        self.vehicles_view.replace(view);
    }
}

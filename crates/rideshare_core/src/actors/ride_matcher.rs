//! Ride matcher actor: pairs waiting passengers with idle vehicles and
//! relays the pickup handshake between the queue and the fleet.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::actors::{SharedMap, VehicleSnapshot, TICK_INTERVAL};
use crate::console::Console;
use crate::map::Coordinate;
use crate::matching::{build_policy, MatchPolicyKind, MatchingPolicy};
use crate::messages::{Inbox, PassengerQueueMessage, RideMatcherMessage};
use crate::objects::{ObjectId, Passenger};

pub struct RideMatcher {
    console: Arc<Console>,
    inbox: Arc<Inbox<RideMatcherMessage>>,
    queue: Arc<Inbox<PassengerQueueMessage>>,
    /// Pickup locations handed to the vehicle manager on a committed match.
    assignments: Arc<SharedMap<Coordinate>>,
    /// At-ride passengers handed to the vehicle manager for boarding.
    pickups: Arc<SharedMap<Passenger>>,
    vehicles_view: Arc<SharedMap<VehicleSnapshot>>,
    /// Unmatched ride requests in id order; waiting passengers are
    /// stationary, so the requested position stays current.
    passengers: BTreeMap<ObjectId, Coordinate>,
    /// Unmatched vehicle requests in id order.
    vehicles: BTreeSet<ObjectId>,
    vehicle_to_passenger: HashMap<ObjectId, ObjectId>,
    passenger_to_vehicle: HashMap<ObjectId, ObjectId>,
    /// Pairs proven unreachable; never re-proposed while the passenger
    /// remains in the system.
    invalid_matches: BTreeSet<(ObjectId, ObjectId)>,
    policy: Box<dyn MatchingPolicy>,
    close_enough: f64,
}

impl RideMatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        console: Arc<Console>,
        inbox: Arc<Inbox<RideMatcherMessage>>,
        queue: Arc<Inbox<PassengerQueueMessage>>,
        assignments: Arc<SharedMap<Coordinate>>,
        pickups: Arc<SharedMap<Passenger>>,
        vehicles_view: Arc<SharedMap<VehicleSnapshot>>,
        policy: MatchPolicyKind,
        close_enough: f64,
    ) -> Self {
        Self {
            console,
            inbox,
            queue,
            assignments,
            pickups,
            vehicles_view,
            passengers: BTreeMap::new(),
            vehicles: BTreeSet::new(),
            vehicle_to_passenger: HashMap::new(),
            passenger_to_vehicle: HashMap::new(),
            invalid_matches: BTreeSet::new(),
            policy: build_policy(policy),
            close_enough,
        }
    }

    /// Run the matching loop on its own thread, forever.
    pub fn start(mut self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ride-matcher".into())
            .spawn(move || loop {
                thread::sleep(TICK_INTERVAL);
                self.tick();
            })
    }

    pub(crate) fn tick(&mut self) {
        self.read_messages();
        if !self.passengers.is_empty() && !self.vehicles.is_empty() {
            self.match_one();
        }
    }

    fn read_messages(&mut self) {
        for message in self.inbox.drain() {
            match message {
                RideMatcherMessage::PassengerRequestsRide { id, position } => {
                    self.passengers.insert(id, position);
                }
                RideMatcherMessage::VehicleRequestsPassenger { id } => {
                    self.vehicles.insert(id);
                }
                RideMatcherMessage::VehicleCannotReachPassenger { id } => {
                    self.vehicle_cannot_reach_passenger(id)
                }
                RideMatcherMessage::VehicleHasArrived { id } => self.vehicle_has_arrived(id),
                RideMatcherMessage::PassengerToVehicle { id, passenger } => {
                    self.passenger_to_vehicle(id, passenger)
                }
                RideMatcherMessage::PassengerIsIneligible { id } => {
                    self.passenger_is_ineligible(id)
                }
                RideMatcherMessage::VehicleIsIneligible { id } => self.vehicle_is_ineligible(id),
            }
        }
    }

    /// One match attempt for the longest-waiting passenger. Vehicles whose
    /// snapshot has not landed yet are skipped until the next tick.
    fn match_one(&mut self) {
        let (&p_id, &p_pos) = self.passengers.iter().next().expect("checked non-empty");

        let candidates: Vec<(ObjectId, Coordinate)> = self
            .vehicles
            .iter()
            .filter(|&&v_id| !self.invalid_matches.contains(&(p_id, v_id)))
            .filter_map(|&v_id| {
                self.vehicles_view
                    .get(v_id)
                    .map(|snapshot| (v_id, snapshot.position))
            })
            .collect();

        match self
            .policy
            .select_vehicle(p_pos, &candidates, self.close_enough)
        {
            Some(v_id) => self.commit_match(p_id, p_pos, v_id),
            None => self.no_possible_match(p_id),
        }
    }

    fn commit_match(&mut self, p_id: ObjectId, p_pos: Coordinate, v_id: ObjectId) {
        self.vehicle_to_passenger.insert(v_id, p_id);
        self.passenger_to_vehicle.insert(p_id, v_id);
        self.passengers.remove(&p_id);
        self.vehicles.remove(&v_id);
        self.console
            .line(format!("Vehicle #{v_id} matched to Passenger #{p_id}."));
        self.assignments.insert(v_id, p_pos);
        self.queue
            .post(PassengerQueueMessage::RideOnWay { id: p_id });
    }

    /// No admissible vehicle right now. The failure counts toward the
    /// passenger's eviction, so one stuck in a vehicle-starved corner
    /// eventually leaves instead of waiting forever.
    fn no_possible_match(&mut self, p_id: ObjectId) {
        self.queue
            .post(PassengerQueueMessage::PassengerFailure { id: p_id });
    }

    fn vehicle_cannot_reach_passenger(&mut self, v_id: ObjectId) {
        let p_id = self
            .vehicle_to_passenger
            .remove(&v_id)
            .expect("un-match for a vehicle that is not matched");
        self.passenger_to_vehicle.remove(&p_id);
        self.invalid_matches.insert((p_id, v_id));
        self.console.line(format!(
            "Vehicle #{v_id} un-matched from Passenger #{p_id}, unreachable."
        ));
        self.queue
            .post(PassengerQueueMessage::PassengerFailure { id: p_id });
    }

    fn vehicle_has_arrived(&mut self, v_id: ObjectId) {
        let p_id = *self
            .vehicle_to_passenger
            .get(&v_id)
            .expect("arrival for a vehicle that is not matched");
        self.queue
            .post(PassengerQueueMessage::RideArrived { id: p_id });
    }

    /// The passenger reached the waiting vehicle: hand them to the fleet,
    /// retire the match, and confirm the pickup to the queue.
    fn passenger_to_vehicle(&mut self, p_id: ObjectId, passenger: Passenger) {
        let v_id = self
            .passenger_to_vehicle
            .remove(&p_id)
            .expect("pickup for a passenger that is not matched");
        self.vehicle_to_passenger.remove(&v_id);
        self.pickups.insert(v_id, passenger);
        self.clear_invalids(p_id);
        self.queue
            .post(PassengerQueueMessage::PassengerPickedUp { id: p_id });
    }

    fn passenger_is_ineligible(&mut self, p_id: ObjectId) {
        self.passengers.remove(&p_id);
        if let Some(v_id) = self.passenger_to_vehicle.remove(&p_id) {
            // The vehicle side caused this, so it needs no notification.
            self.vehicle_to_passenger.remove(&v_id);
        }
        self.clear_invalids(p_id);
    }

    fn vehicle_is_ineligible(&mut self, v_id: ObjectId) {
        self.vehicles.remove(&v_id);
        if let Some(p_id) = self.vehicle_to_passenger.remove(&v_id) {
            self.passenger_to_vehicle.remove(&p_id);
            self.queue
                .post(PassengerQueueMessage::PassengerFailure { id: p_id });
        }
    }

    /// Forget every invalid pairing for a passenger who left the system or
    /// was picked up.
    fn clear_invalids(&mut self, p_id: ObjectId) {
        self.invalid_matches.retain(|&(p, _)| p != p_id);
    }

    #[cfg(test)]
    pub(crate) fn matches_are_mutual_inverses(&self) -> bool {
        self.vehicle_to_passenger.len() == self.passenger_to_vehicle.len()
            && self
                .vehicle_to_passenger
                .iter()
                .all(|(v, p)| self.passenger_to_vehicle.get(p) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Coordinate;
    use crate::objects::{Color, PassengerStatus, VehicleState};
    use std::sync::mpsc::Receiver;

    struct Fixture {
        matcher: RideMatcher,
        inbox: Arc<Inbox<RideMatcherMessage>>,
        queue: Arc<Inbox<PassengerQueueMessage>>,
        assignments: Arc<SharedMap<Coordinate>>,
        pickups: Arc<SharedMap<Passenger>>,
        vehicles_view: Arc<SharedMap<VehicleSnapshot>>,
        lines: Receiver<String>,
    }

    fn fixture(policy: MatchPolicyKind, close_enough: f64) -> Fixture {
        let (console, lines) = Console::capture();
        let inbox = Arc::new(Inbox::new());
        let queue = Arc::new(Inbox::new());
        let assignments = Arc::new(SharedMap::new());
        let pickups = Arc::new(SharedMap::new());
        let vehicles_view = Arc::new(SharedMap::new());
        let matcher = RideMatcher::new(
            console,
            inbox.clone(),
            queue.clone(),
            assignments.clone(),
            pickups.clone(),
            vehicles_view.clone(),
            policy,
            close_enough,
        );
        Fixture {
            matcher,
            inbox,
            queue,
            assignments,
            pickups,
            vehicles_view,
            lines,
        }
    }

    fn at(x: f64, y: f64) -> Coordinate {
        Coordinate { x, y }
    }

    fn add_vehicle(f: &Fixture, id: ObjectId, position: Coordinate) {
        f.vehicles_view.insert(
            id,
            VehicleSnapshot {
                id,
                position,
                destination: position,
                state: VehicleState::NoPassengerQueued,
                color: Color {
                    red: 0,
                    green: 0,
                    blue: 0,
                },
                passenger: None,
            },
        );
        f.inbox
            .post(RideMatcherMessage::VehicleRequestsPassenger { id });
    }

    fn add_passenger(f: &Fixture, id: ObjectId, position: Coordinate) {
        f.inbox
            .post(RideMatcherMessage::PassengerRequestsRide { id, position });
    }

    fn at_ride_passenger(id: ObjectId, position: Coordinate) -> Passenger {
        let mut passenger = Passenger::new(
            id,
            position,
            at(9.0, 9.0),
            Color {
                red: 0,
                green: 0,
                blue: 0,
            },
            0.001,
        );
        passenger.status = PassengerStatus::AtRide;
        passenger
    }

    #[test]
    fn duplicate_ride_requests_collapse_to_one() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_passenger(&f, 1, at(0.0, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();
        assert_eq!(f.matcher.passengers.len(), 1);
    }

    #[test]
    fn committing_a_match_updates_both_maps_and_notifies_both_sides() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_vehicle(&f, 4, at(0.5, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();

        assert!(f.matcher.matches_are_mutual_inverses());
        assert_eq!(f.matcher.vehicle_to_passenger.get(&4), Some(&1));
        assert!(f.matcher.passengers.is_empty());
        assert!(f.matcher.vehicles.is_empty());
        assert_eq!(f.assignments.get(4), Some(at(0.0, 0.0)));
        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::RideOnWay { id: 1 })));
        let lines: Vec<String> = f.lines.try_iter().collect();
        assert!(lines.contains(&"Vehicle #4 matched to Passenger #1.".to_string()));
    }

    #[test]
    fn one_match_per_tick_pairs_everyone_in_two_ticks() {
        // Two passengers and two vehicles, pairwise equidistant.
        let mut f = fixture(MatchPolicyKind::Closest, 0.1);
        add_vehicle(&f, 10, at(1.0, 0.0));
        add_vehicle(&f, 11, at(-1.0, 0.0));
        add_passenger(&f, 1, at(0.0, 1.0));
        add_passenger(&f, 2, at(0.0, -1.0));

        f.matcher.tick();
        assert_eq!(f.matcher.vehicle_to_passenger.len(), 1);
        f.matcher.tick();
        assert_eq!(f.matcher.vehicle_to_passenger.len(), 2);

        assert!(f.matcher.matches_are_mutual_inverses());
        assert!(f.matcher.invalid_matches.is_empty());
        let match_lines = f
            .lines
            .try_iter()
            .filter(|line| line.contains("matched to"))
            .count();
        assert_eq!(match_lines, 2);
    }

    #[test]
    fn unreachable_pair_is_never_proposed_again() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_vehicle(&f, 4, at(0.5, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();
        f.queue.drain();

        f.inbox
            .post(RideMatcherMessage::VehicleCannotReachPassenger { id: 4 });
        f.matcher.tick();

        assert!(f.matcher.vehicle_to_passenger.is_empty());
        assert!(f.matcher.invalid_matches.contains(&(1, 4)));
        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::PassengerFailure { id: 1 })));
        let lines: Vec<String> = f.lines.try_iter().collect();
        assert!(lines.contains(&"Vehicle #4 un-matched from Passenger #1, unreachable.".to_string()));

        // Both sides come back; the invalid pair is skipped, and with no
        // other vehicle available the passenger takes another failure.
        add_passenger(&f, 1, at(0.0, 0.0));
        f.inbox
            .post(RideMatcherMessage::VehicleRequestsPassenger { id: 4 });
        f.matcher.tick();

        assert!(f.matcher.vehicle_to_passenger.is_empty());
        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::PassengerFailure { id: 1 })));
    }

    #[test]
    fn arrival_is_relayed_to_the_matched_passenger() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_vehicle(&f, 4, at(0.5, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();
        f.queue.drain();

        f.inbox
            .post(RideMatcherMessage::VehicleHasArrived { id: 4 });
        f.matcher.tick();

        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::RideArrived { id: 1 })));
        // Arrival does not retire the match; pickup does.
        assert!(f.matcher.matches_are_mutual_inverses());
        assert_eq!(f.matcher.vehicle_to_passenger.len(), 1);
    }

    #[test]
    fn pickup_hands_the_passenger_to_the_fleet_and_clears_the_match() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_vehicle(&f, 4, at(0.5, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();
        f.queue.drain();
        // A leftover invalid pairing from an earlier failed vehicle.
        f.matcher.invalid_matches.insert((1, 99));

        f.inbox.post(RideMatcherMessage::PassengerToVehicle {
            id: 1,
            passenger: at_ride_passenger(1, at(0.5, 0.0)),
        });
        f.matcher.tick();

        assert!(f.matcher.vehicle_to_passenger.is_empty());
        assert!(f.matcher.passenger_to_vehicle.is_empty());
        assert!(f.matcher.invalid_matches.is_empty());
        let handed = f.pickups.get(4).expect("passenger handed to vehicle 4");
        assert_eq!(handed.id(), 1);
        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::PassengerPickedUp { id: 1 })));
    }

    #[test]
    fn evicted_passenger_is_unmatched_silently() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_vehicle(&f, 4, at(0.5, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();
        f.queue.drain();

        f.inbox
            .post(RideMatcherMessage::PassengerIsIneligible { id: 1 });
        f.matcher.tick();

        assert!(f.matcher.vehicle_to_passenger.is_empty());
        assert!(f.matcher.passenger_to_vehicle.is_empty());
        assert!(f.queue.drain().is_empty());
    }

    #[test]
    fn evicted_vehicle_frees_its_matched_passenger() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        add_vehicle(&f, 4, at(0.5, 0.0));
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();
        f.queue.drain();

        f.inbox
            .post(RideMatcherMessage::VehicleIsIneligible { id: 4 });
        f.matcher.tick();

        assert!(f.matcher.vehicle_to_passenger.is_empty());
        assert!(!f.matcher.vehicles.contains(&4));
        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::PassengerFailure { id: 1 })));
    }

    #[test]
    fn vehicles_without_a_published_snapshot_are_skipped() {
        let mut f = fixture(MatchPolicyKind::Simple, 1.0);
        // Vehicle 7 requested a passenger but its snapshot never landed.
        f.inbox
            .post(RideMatcherMessage::VehicleRequestsPassenger { id: 7 });
        add_passenger(&f, 1, at(0.0, 0.0));
        f.matcher.tick();

        assert!(f.matcher.vehicle_to_passenger.is_empty());
        assert!(f
            .queue
            .drain()
            .iter()
            .any(|m| matches!(m, PassengerQueueMessage::PassengerFailure { id: 1 })));
    }
}

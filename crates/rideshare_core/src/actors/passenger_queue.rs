//! Passenger queue actor: generates passengers, requests rides for them,
//! and walks them to their arrived vehicle.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actors::{PassengerSnapshot, SharedMap, TICK_INTERVAL};
use crate::config::SimulationConfig;
use crate::console::Console;
use crate::map::RouteModel;
use crate::messages::{Inbox, PassengerQueueMessage, RideMatcherMessage};
use crate::objects::{Color, ObjectId, Passenger, PassengerStatus};
use crate::routing::RoutePlanner;

pub struct PassengerQueue {
    model: Arc<RouteModel>,
    planner: Arc<RoutePlanner>,
    console: Arc<Console>,
    inbox: Arc<Inbox<PassengerQueueMessage>>,
    matcher: Arc<Inbox<RideMatcherMessage>>,
    /// Passengers waiting for a match, keyed by id. Owned by this actor.
    waiting: HashMap<ObjectId, Passenger>,
    /// Passengers between "ride arrived" and "picked up".
    walking: HashMap<ObjectId, Passenger>,
    waiting_view: Arc<SharedMap<PassengerSnapshot>>,
    walking_view: Arc<SharedMap<PassengerSnapshot>>,
    next_id: ObjectId,
    max_objects: usize,
    min_wait_secs: u64,
    wait_jitter_secs: u64,
    /// Current randomised duration between generation attempts.
    cycle: Duration,
    last_attempt: Instant,
    rng: StdRng,
}

impl PassengerQueue {
    /// Build the queue and generate the initial half-capacity of
    /// passengers, retrying past any unreachable candidates.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: Arc<RouteModel>,
        planner: Arc<RoutePlanner>,
        console: Arc<Console>,
        inbox: Arc<Inbox<PassengerQueueMessage>>,
        matcher: Arc<Inbox<RideMatcherMessage>>,
        waiting_view: Arc<SharedMap<PassengerSnapshot>>,
        walking_view: Arc<SharedMap<PassengerSnapshot>>,
        config: &SimulationConfig,
        seed: u64,
    ) -> Self {
        let mut queue = Self {
            model,
            planner,
            console,
            inbox,
            matcher,
            waiting: HashMap::new(),
            walking: HashMap::new(),
            waiting_view,
            walking_view,
            next_id: 0,
            max_objects: config.max_passengers,
            min_wait_secs: config.min_wait_secs,
            wait_jitter_secs: config.wait_jitter_secs,
            cycle: Duration::ZERO,
            last_attempt: Instant::now(),
            rng: StdRng::seed_from_u64(seed),
        };
        queue.cycle = queue.sample_cycle();
        while queue.waiting.len() < queue.max_objects / 2 {
            queue.generate_new();
        }
        queue.publish_views();
        queue
    }

    /// Run the tick loop on its own thread, forever.
    pub fn start(mut self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("passenger-queue".into())
            .spawn(move || loop {
                thread::sleep(TICK_INTERVAL);
                self.tick();
            })
    }

    pub(crate) fn tick(&mut self) {
        self.maybe_generate();
        self.read_messages();
        self.walk_passengers();
        self.request_rides();
        self.publish_views();
    }

    /// Uniform wait in `[min_wait, min_wait + jitter)` seconds.
    fn sample_cycle(&mut self) -> Duration {
        let secs =
            self.min_wait_secs as f64 + self.rng.gen::<f64>() * self.wait_jitter_secs as f64;
        Duration::from_millis((secs * 1000.0) as u64)
    }

    fn maybe_generate(&mut self) {
        if self.max_objects == 0 {
            return;
        }
        if self.last_attempt.elapsed() < self.cycle {
            return;
        }
        if self.waiting.len() < self.max_objects {
            self.generate_new();
            self.cycle = self.sample_cycle();
        } else {
            self.console
                .line("Queue full, no new passenger generated.".to_string());
        }
        self.last_attempt = Instant::now();
    }

    /// Create one passenger at a random position with a random destination.
    /// A candidate whose destination is unreachable is discarded without
    /// consuming an id.
    fn generate_new(&mut self) {
        let start = self.model.random_position(&mut self.rng);
        let destination = self.model.random_position(&mut self.rng);
        let color = Color::random(&mut self.rng);
        let mut passenger = Passenger::new(
            self.next_id,
            start,
            destination,
            color,
            self.model.distance_per_cycle(),
        );

        self.planner.a_star_search(&mut passenger);
        if passenger.obj.path.is_empty() {
            self.console.line(
                "A new passenger with an unreachable destination from their position left."
                    .to_string(),
            );
            return;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.console.line(format!(
            "Passenger #{id} requesting ride from: {}, {}.",
            start.y, start.x
        ));
        self.waiting.insert(id, passenger);
    }

    fn read_messages(&mut self) {
        for message in self.inbox.drain() {
            match message {
                // Nothing to do here...yet.
                PassengerQueueMessage::RideOnWay { .. } => {}
                PassengerQueueMessage::RideArrived { id } => self.ride_arrived(id),
                PassengerQueueMessage::PassengerPickedUp { id } => {
                    self.walking.remove(&id);
                }
                PassengerQueueMessage::PassengerFailure { id } => self.passenger_failure(id),
            }
        }
    }

    /// The matched vehicle is parked at the road node closest to the
    /// passenger; start them walking toward it.
    fn ride_arrived(&mut self, id: ObjectId) {
        let mut passenger = self
            .waiting
            .remove(&id)
            .expect("ride arrived for unknown passenger");
        let node = self.model.find_closest_node(passenger.obj.position);
        passenger.begin_walking(self.model.node(node));
        self.walking.insert(id, passenger);
    }

    fn passenger_failure(&mut self, id: ObjectId) {
        let passenger = self
            .waiting
            .get_mut(&id)
            .expect("failure for unknown passenger");
        if passenger.obj.movement_failure() {
            self.waiting.remove(&id);
            self.matcher
                .post(RideMatcherMessage::PassengerIsIneligible { id });
            self.console.line(format!(
                "Passenger #{id} unreachable multiple times, leaving map."
            ));
        } else {
            // Eligible again; a fresh request goes out on this same tick.
            passenger.status = PassengerStatus::NoRideRequested;
        }
    }

    /// Step every walking passenger; the ones that reach the vehicle this
    /// tick are announced to the matcher for pickup.
    fn walk_passengers(&mut self) {
        let mut arrived = Vec::new();
        for (&id, passenger) in self.walking.iter_mut() {
            if passenger.status == PassengerStatus::Walking && passenger.walk_step() {
                arrived.push(id);
            }
        }
        for id in arrived {
            let passenger = &self.walking[&id];
            self.matcher.post(RideMatcherMessage::PassengerToVehicle {
                id,
                passenger: passenger.without_path(),
            });
        }
    }

    fn request_rides(&mut self) {
        let mut requests = Vec::new();
        for (&id, passenger) in self.waiting.iter_mut() {
            if passenger.status == PassengerStatus::NoRideRequested {
                passenger.status = PassengerStatus::RideRequested;
                requests.push((id, passenger.obj.position));
            }
        }
        for (id, position) in requests {
            self.matcher
                .post(RideMatcherMessage::PassengerRequestsRide { id, position });
        }
    }

    fn publish_views(&self) {
        self.waiting_view.replace(snapshot_of(&self.waiting));
        self.walking_view.replace(snapshot_of(&self.walking));
    }
}

fn snapshot_of(passengers: &HashMap<ObjectId, Passenger>) -> HashMap<ObjectId, PassengerSnapshot> {
    passengers
        .iter()
        .map(|(&id, passenger)| {
            (
                id,
                PassengerSnapshot {
                    id,
                    position: passenger.obj.position,
                    destination: passenger.obj.destination,
                    status: passenger.status,
                    color: passenger.obj.color,
                },
            )
        })
        .collect()
}

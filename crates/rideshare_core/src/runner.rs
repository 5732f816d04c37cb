//! Simulation wiring: builds the three actors around their shared plumbing
//! and runs each on its own tick thread.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::actors::{
    PassengerQueue, PassengerSnapshot, RideMatcher, SharedMap, VehicleManager, VehicleSnapshot,
};
use crate::config::SimulationConfig;
use crate::console::Console;
use crate::map::{Coordinate, RouteModel};
use crate::messages::Inbox;
use crate::objects::Passenger;
use crate::routing::RoutePlanner;

/// Read-only snapshot handles for the main-thread map reader. Entries can
/// vanish between reads; a reader just skips what is gone.
#[derive(Clone)]
pub struct SimulationViews {
    pub waiting_passengers: Arc<SharedMap<PassengerSnapshot>>,
    pub walking_passengers: Arc<SharedMap<PassengerSnapshot>>,
    pub vehicles: Arc<SharedMap<VehicleSnapshot>>,
}

/// The wired-up simulation. Construction already generates the initial
/// fleet and passengers (and logs them); [`Simulation::start`] begins the
/// tick loops.
pub struct Simulation {
    queue: PassengerQueue,
    manager: VehicleManager,
    matcher: RideMatcher,
    views: SimulationViews,
}

impl Simulation {
    pub fn new(config: &SimulationConfig, model: Arc<RouteModel>, console: Arc<Console>) -> Self {
        let planner = Arc::new(RoutePlanner::new(model.clone()));
        let queue_inbox = Arc::new(Inbox::new());
        let matcher_inbox = Arc::new(Inbox::new());
        let assignments: Arc<SharedMap<Coordinate>> = Arc::new(SharedMap::new());
        let pickups: Arc<SharedMap<Passenger>> = Arc::new(SharedMap::new());
        let views = SimulationViews {
            waiting_passengers: Arc::new(SharedMap::new()),
            walking_passengers: Arc::new(SharedMap::new()),
            vehicles: Arc::new(SharedMap::new()),
        };

        let manager = VehicleManager::new(
            model.clone(),
            planner.clone(),
            console.clone(),
            matcher_inbox.clone(),
            assignments.clone(),
            pickups.clone(),
            views.vehicles.clone(),
            config,
            config.seed,
        );
        let queue = PassengerQueue::new(
            model.clone(),
            planner,
            console.clone(),
            queue_inbox.clone(),
            matcher_inbox.clone(),
            views.waiting_passengers.clone(),
            views.walking_passengers.clone(),
            config,
            config.seed.wrapping_add(1),
        );
        let matcher = RideMatcher::new(
            console,
            matcher_inbox,
            queue_inbox,
            assignments,
            pickups,
            views.vehicles.clone(),
            config.match_policy,
            config.close_enough(model.bounds()),
        );

        Self {
            queue,
            manager,
            matcher,
            views,
        }
    }

    pub fn views(&self) -> SimulationViews {
        self.views.clone()
    }

    /// Spawn the three actor threads. They run until the process exits.
    pub fn start(self) -> io::Result<Vec<JoinHandle<()>>> {
        Ok(vec![
            self.queue.start()?,
            self.manager.start()?,
            self.matcher.start()?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchPolicyKind;
    use crate::test_helpers::line_map;
    use std::sync::mpsc::Receiver;

    struct Harness {
        sim: Simulation,
        lines: Receiver<String>,
        collected: Vec<String>,
    }

    impl Harness {
        fn new(config: &SimulationConfig) -> Self {
            let model = Arc::new(line_map(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]));
            let (console, lines) = Console::capture();
            let sim = Simulation::new(config, model, console);
            Self {
                sim,
                lines,
                collected: Vec::new(),
            }
        }

        /// One scheduler round: each actor ticks once, in a fixed order the
        /// OS scheduler is free to vary in production.
        fn step(&mut self) {
            self.sim.queue.tick();
            self.sim.manager.tick();
            self.sim.matcher.tick();
            self.collected.extend(self.lines.try_iter());
        }

        fn saw(&self, needle: &str) -> bool {
            self.collected.iter().any(|line| line.contains(needle))
        }

        fn index_of(&self, needle: &str) -> usize {
            self.collected
                .iter()
                .position(|line| line.contains(needle))
                .unwrap_or_else(|| panic!("no line containing '{needle}'"))
        }
    }

    #[test]
    fn a_ride_completes_end_to_end() {
        let config = SimulationConfig {
            max_passengers: 20, // initial fill is half: ten passengers
            max_vehicles: 1,
            match_policy: MatchPolicyKind::Simple,
            min_wait_secs: 600, // no further generation during the test
            wait_jitter_secs: 0,
            ..SimulationConfig::default()
        };
        let mut h = Harness::new(&config);

        for _ in 0..100_000 {
            h.step();
            assert!(h.sim.matcher.matches_are_mutual_inverses());
            if h.saw("dropped off") {
                break;
            }
        }

        assert!(h.saw("matched to Passenger"));
        assert!(h.saw("picked up Passenger"));
        assert!(h.saw("dropped off Passenger"));
        assert!(h.index_of("matched to") < h.index_of("picked up"));
        assert!(h.index_of("picked up") < h.index_of("dropped off"));

        // The delivered passenger left both queue maps; the vehicle
        // cruises on.
        let views = h.sim.views();
        assert!(views.walking_passengers.is_empty());
        assert_eq!(views.vehicles.len(), 1);
    }

    #[test]
    fn caps_hold_during_a_long_run() {
        let config = SimulationConfig {
            max_passengers: 4,
            max_vehicles: 4,
            match_policy: MatchPolicyKind::Closest,
            min_wait_secs: 0,
            wait_jitter_secs: 0,
            ..SimulationConfig::default()
        };
        let mut h = Harness::new(&config);

        for round in 0..20_000 {
            h.step();
            if round % 100 == 0 {
                let views = h.sim.views();
                assert_eq!(views.vehicles.len(), 4);
                assert!(views.waiting_passengers.len() <= 4);
                assert!(h.sim.matcher.matches_are_mutual_inverses());
            }
        }

        // A run this long on a fully connected map serves somebody.
        assert!(h.saw("picked up Passenger"));
        assert!(h.saw("dropped off Passenger"));
    }

    #[test]
    fn zero_capacity_creates_no_actors_and_stays_silent() {
        let config = SimulationConfig {
            max_passengers: 0,
            max_vehicles: 0,
            min_wait_secs: 0,
            wait_jitter_secs: 0,
            ..SimulationConfig::default()
        };
        let mut h = Harness::new(&config);

        for _ in 0..1_000 {
            h.step();
        }

        assert!(h.collected.is_empty());
        let views = h.sim.views();
        assert!(views.waiting_passengers.is_empty());
        assert!(views.walking_passengers.is_empty());
        assert!(views.vehicles.is_empty());
    }
}

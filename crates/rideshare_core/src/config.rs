//! Simulation parameters, with the defaults the CLI advertises.

use serde::{Deserialize, Serialize};

use crate::map::MapBounds;
use crate::matching::MatchPolicyKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Base name of the map; the graph is read from `data/<name>.osm`.
    pub map_name: String,
    /// Cap on waiting passengers. Generation pauses while the queue is full.
    pub max_passengers: usize,
    /// Fleet size. The manager regenerates vehicles to hold this level.
    pub max_vehicles: usize,
    /// Policy used to pair passengers with vehicles.
    pub match_policy: MatchPolicyKind,
    /// Minimum seconds between passenger generation attempts.
    pub min_wait_secs: u64,
    /// Additional uniform random seconds on top of `min_wait_secs`.
    pub wait_jitter_secs: u64,
    /// Fraction of the map's latitude span within which a vehicle counts as
    /// "close enough" for the closest-match policy.
    pub close_enough_fraction: f64,
    /// Seed for the actors' RNGs; a fixed seed reproduces a run's decisions
    /// (thread interleaving aside).
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            map_name: "downtown-kc".to_string(),
            max_passengers: 10,
            max_vehicles: 10,
            match_policy: MatchPolicyKind::Closest,
            min_wait_secs: 3,
            wait_jitter_secs: 2,
            close_enough_fraction: 0.15,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// The closest-match admission radius for a given map.
    pub fn close_enough(&self, bounds: &MapBounds) -> f64 {
        bounds.lat_span() * self.close_enough_fraction
    }
}

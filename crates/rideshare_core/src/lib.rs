//! # Rideshare Marketplace Simulation Core
//!
//! A concurrent simulation of a ride-hailing marketplace over a real road
//! network: passengers spawn at random map positions and request rides, a
//! fleet of vehicles cruises an OpenStreetMap graph, and a central matcher
//! pairs the two sides.
//!
//! ## Overview
//!
//! - **Road model**: OSM nodes, ways and drivable roads, with closest-node
//!   snapping and uniform random positions ([`map`])
//! - **Routing**: mutex-serialised A\* search shared by every actor
//!   ([`routing`])
//! - **Actors**: passenger queue, vehicle manager and ride matcher, one
//!   tick thread each, exchanging messages through per-recipient inboxes
//!   ([`actors`], [`messages`])
//! - **Matching**: pluggable first-fit and closest-vehicle policies
//!   ([`matching`])
//!
//! ## Key concepts
//!
//! - **Ticks**: every actor loops forever, sleeping ~10 ms per cycle
//! - **Messages over calls**: actors never call each other from tick loops;
//!   they post tagged messages and drain their own inbox next tick
//! - **Failure counters**: unreachable destinations are values, not errors;
//!   an actor that fails too often leaves the map
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rideshare_core::config::SimulationConfig;
//! use rideshare_core::console::Console;
//! use rideshare_core::map::RouteModel;
//! use rideshare_core::runner::Simulation;
//!
//! let xml = std::fs::read("data/downtown-kc.osm").expect("map file");
//! let model = Arc::new(RouteModel::from_xml(&xml[..]).expect("road graph"));
//! let config = SimulationConfig::default();
//! let sim = Simulation::new(&config, model, Console::stdout());
//! let _threads = sim.start().expect("actor threads");
//! ```

pub mod actors;
pub mod config;
pub mod console;
pub mod map;
pub mod matching;
pub mod messages;
pub mod objects;
pub mod routing;
pub mod runner;

#[cfg(test)]
pub mod test_helpers;

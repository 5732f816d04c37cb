//! Road-network model: nodes, ways and drivable roads from OpenStreetMap data.
//!
//! The model is immutable once built and is shared between the actors behind
//! an `Arc`. All mutable search state (A* scratch values) lives in the route
//! planner, not here.

pub mod osm;

use std::collections::HashMap;

use rand::Rng;
use thiserror::Error;

/// A map-native position in degrees: `x` is longitude, `y` is latitude.
/// Equality is exact, which the simulation relies on for "arrived at
/// destination" checks (destinations are always snapped to node positions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Straight-line (Euclidean) distance in map degrees.
    pub fn distance(self, other: Coordinate) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Drivable road categories, ordered minor to major. Only these highway
/// values become roads; `living_street` maps to [`RoadKind::Residential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoadKind {
    Residential,
    Tertiary,
    Secondary,
    Primary,
    Trunk,
    Motorway,
}

impl RoadKind {
    pub fn from_highway_tag(value: &str) -> Option<RoadKind> {
        match value {
            "motorway" => Some(RoadKind::Motorway),
            "trunk" => Some(RoadKind::Trunk),
            "primary" => Some(RoadKind::Primary),
            "secondary" => Some(RoadKind::Secondary),
            "tertiary" => Some(RoadKind::Tertiary),
            "residential" | "living_street" => Some(RoadKind::Residential),
            _ => None,
        }
    }
}

/// An ordered run of node indices, as read from an OSM `<way>`.
#[derive(Debug, Clone)]
pub struct Way {
    pub nodes: Vec<usize>,
}

/// A drivable way. `way` indexes into [`RouteModel::ways`].
#[derive(Debug, Clone, Copy)]
pub struct Road {
    pub way: usize,
    pub kind: RoadKind,
}

/// Geographic extent of the map, from the OSM `<bounds>` element.
#[derive(Debug, Clone, Copy)]
pub struct MapBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl MapBounds {
    pub fn lat_span(&self) -> f64 {
        (self.max_lat - self.min_lat).abs()
    }
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to parse OSM XML: {0}")]
    Xml(String),
    #[error("map bounds are not defined")]
    MissingBounds,
    #[error("invalid map bounds: lat [{min_lat}, {max_lat}], lon [{min_lon}, {max_lon}]")]
    InvalidBounds {
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    },
    #[error("map has no drivable road nodes")]
    NoRoadNodes,
}

/// The static road graph plus the lookups the planner and the actors need:
/// uniform random positions, closest-road-node snapping, and node-to-road
/// adjacency for neighbour expansion.
#[derive(Debug)]
pub struct RouteModel {
    bounds: MapBounds,
    nodes: Vec<Coordinate>,
    ways: Vec<Way>,
    roads: Vec<Road>,
    node_to_roads: HashMap<usize, Vec<usize>>,
}

impl RouteModel {
    /// Build a model from already-resolved graph data. Roads are sorted by
    /// kind ordinal; the node-to-road adjacency is derived here.
    pub fn new(
        bounds: MapBounds,
        nodes: Vec<Coordinate>,
        ways: Vec<Way>,
        mut roads: Vec<Road>,
    ) -> Result<Self, MapError> {
        if bounds.min_lat > bounds.max_lat
            || bounds.min_lon > bounds.max_lon
            || !bounds.min_lat.is_finite()
            || !bounds.max_lat.is_finite()
            || !bounds.min_lon.is_finite()
            || !bounds.max_lon.is_finite()
        {
            return Err(MapError::InvalidBounds {
                min_lat: bounds.min_lat,
                max_lat: bounds.max_lat,
                min_lon: bounds.min_lon,
                max_lon: bounds.max_lon,
            });
        }

        roads.sort_by_key(|road| road.kind);

        let mut node_to_roads: HashMap<usize, Vec<usize>> = HashMap::new();
        for (road_idx, road) in roads.iter().enumerate() {
            for &node_idx in &ways[road.way].nodes {
                node_to_roads.entry(node_idx).or_default().push(road_idx);
            }
        }
        if node_to_roads.is_empty() {
            return Err(MapError::NoRoadNodes);
        }

        Ok(Self {
            bounds,
            nodes,
            ways,
            roads,
            node_to_roads,
        })
    }

    /// Parse an OSM XML document into a model. See [`osm::load`].
    pub fn from_xml(reader: impl std::io::Read) -> Result<Self, MapError> {
        osm::load(reader)
    }

    pub fn bounds(&self) -> &MapBounds {
        &self.bounds
    }

    pub fn node(&self, index: usize) -> Coordinate {
        self.nodes[index]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    /// Road indices passing through the given node. Empty if the node is not
    /// part of any drivable way.
    pub fn roads_through(&self, node: usize) -> &[usize] {
        self.node_to_roads
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Node indices of the way backing the given road.
    pub fn road_way_nodes(&self, road: usize) -> &[usize] {
        &self.ways[self.roads[road].way].nodes
    }

    /// The per-tick movement cap shared by every map object, derived from
    /// the map's latitude span.
    pub fn distance_per_cycle(&self) -> f64 {
        self.bounds.lat_span() / 1000.0
    }

    /// Uniform random coordinate within the map bounds.
    pub fn random_position<R: Rng>(&self, rng: &mut R) -> Coordinate {
        Coordinate {
            x: rng.gen_range(self.bounds.min_lon..=self.bounds.max_lon),
            y: rng.gen_range(self.bounds.min_lat..=self.bounds.max_lat),
        }
    }

    /// Closest road node to a coordinate, by linear scan over every node of
    /// every road. Ties keep the first node encountered.
    ///
    /// # Panics
    ///
    /// Construction guarantees at least one road node, so this only panics
    /// if the model was built with an inconsistent graph.
    pub fn find_closest_node(&self, coordinate: Coordinate) -> usize {
        let mut closest: Option<usize> = None;
        let mut min_dist = f64::MAX;
        for road in &self.roads {
            for &node_idx in &self.ways[road.way].nodes {
                let dist = coordinate.distance(self.nodes[node_idx]);
                if dist < min_dist {
                    min_dist = dist;
                    closest = Some(node_idx);
                }
            }
        }
        closest.expect("closest-node lookup on an empty road graph")
    }
}

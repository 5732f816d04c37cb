//! Shared test fixtures: tiny road networks with known geometry.

use crate::map::{Coordinate, MapBounds, Road, RoadKind, RouteModel, Way};

/// Build a model from node positions and ways given as index lists. Every
/// way becomes a residential road; the bounds pad the node extent so random
/// positions can fall off-road like they do on a real map.
pub fn map_from_ways(points: &[(f64, f64)], ways: &[&[usize]]) -> RouteModel {
    let nodes: Vec<Coordinate> = points.iter().map(|&(x, y)| Coordinate { x, y }).collect();

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lon = f64::MAX;
    let mut max_lon = f64::MIN;
    for &(x, y) in points {
        min_lon = min_lon.min(x);
        max_lon = max_lon.max(x);
        min_lat = min_lat.min(y);
        max_lat = max_lat.max(y);
    }
    let bounds = MapBounds {
        min_lat: min_lat - 0.5,
        max_lat: max_lat + 0.5,
        min_lon: min_lon - 0.5,
        max_lon: max_lon + 0.5,
    };

    let ways: Vec<Way> = ways
        .iter()
        .map(|indices| Way {
            nodes: indices.to_vec(),
        })
        .collect();
    let roads: Vec<Road> = (0..ways.len())
        .map(|way| Road {
            way,
            kind: RoadKind::Residential,
        })
        .collect();

    RouteModel::new(bounds, nodes, ways, roads).expect("test map")
}

/// All nodes chained into a single way.
pub fn line_map(points: &[(f64, f64)]) -> RouteModel {
    let all: Vec<usize> = (0..points.len()).collect();
    map_from_ways(points, &[all.as_slice()])
}

/// Two ways from `(0,0)` to `(2,0)`: a straight line through `(1,0)` and a
/// longer detour through `(1, 1.5)`.
pub fn forked_map() -> RouteModel {
    map_from_ways(
        &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (1.0, 1.5)],
        &[&[0, 1, 2], &[0, 3, 2]],
    )
}

/// A connected western line plus one isolated road node at `(10, 10)` that
/// nothing can reach.
pub fn split_map() -> RouteModel {
    map_from_ways(
        &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (10.0, 10.0)],
        &[&[0, 1, 2], &[3]],
    )
}

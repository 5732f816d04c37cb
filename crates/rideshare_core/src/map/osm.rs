//! OSM XML loading: resolves the raw document into a [`RouteModel`].
//!
//! Only the pieces the simulation needs are kept: the `<bounds>` element
//! (required), node positions, and ways tagged with a drivable `highway`
//! value. Everything else in the document is ignored.

use std::collections::HashMap;
use std::io::Read;

use osm_xml::{UnresolvedReference, OSM};

use super::{Coordinate, MapBounds, MapError, Road, RoadKind, RouteModel, Way};

/// Parse an OSM XML document from a reader and build the route model.
pub fn load(reader: impl Read) -> Result<RouteModel, MapError> {
    let doc = OSM::parse(reader).map_err(|e| MapError::Xml(format!("{e:?}")))?;

    let bounds = doc.bounds.ok_or(MapError::MissingBounds)?;
    let bounds = MapBounds {
        min_lat: bounds.minlat,
        max_lat: bounds.maxlat,
        min_lon: bounds.minlon,
        max_lon: bounds.maxlon,
    };

    // Dense node indices in stable id order, so a given file always
    // produces the same graph.
    let mut node_ids: Vec<i64> = doc.nodes.keys().copied().collect();
    node_ids.sort_unstable();
    let index_of: HashMap<i64, usize> = node_ids
        .iter()
        .enumerate()
        .map(|(idx, &id)| (id, idx))
        .collect();
    let nodes: Vec<Coordinate> = node_ids
        .iter()
        .map(|id| {
            let node = &doc.nodes[id];
            Coordinate {
                x: node.lon,
                y: node.lat,
            }
        })
        .collect();

    let mut way_ids: Vec<i64> = doc.ways.keys().copied().collect();
    way_ids.sort_unstable();

    let mut ways = Vec::new();
    let mut roads = Vec::new();
    for id in way_ids {
        let way = &doc.ways[&id];
        let way_num = ways.len();

        let mut node_indices = Vec::new();
        for reference in &way.nodes {
            // Ways nesting other ways or relations are not road geometry.
            if let UnresolvedReference::Node(node_id) = reference {
                if let Some(&idx) = index_of.get(node_id) {
                    node_indices.push(idx);
                }
            }
        }
        ways.push(Way {
            nodes: node_indices,
        });

        for tag in &way.tags {
            if tag.key == "highway" {
                if let Some(kind) = RoadKind::from_highway_tag(&tag.val) {
                    roads.push(Road { way: way_num, kind });
                }
            }
        }
    }

    RouteModel::new(bounds, nodes, ways, roads)
}

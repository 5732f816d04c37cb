//! Route planning: A* search over the shared road model.
//!
//! The planner owns all mutable search state (per-node scratch values and
//! the open list) behind a single mutex, so concurrent searches from the
//! actor threads serialise cleanly. Every search ends by resetting the
//! scratch, whether or not a path was found.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use crate::map::{Coordinate, RouteModel};
use crate::objects::Routable;

/// Per-node A* scratch values. `reset` restores exactly this default.
#[derive(Debug, Clone)]
struct NodeScratch {
    parent: Option<usize>,
    g: f64,
    h: f64,
    visited: bool,
}

impl Default for NodeScratch {
    fn default() -> Self {
        Self {
            parent: None,
            g: 0.0,
            h: f64::INFINITY,
            visited: false,
        }
    }
}

struct SearchState {
    scratch: Vec<NodeScratch>,
    open_list: Vec<usize>,
}

impl SearchState {
    fn new(node_count: usize) -> Self {
        Self {
            scratch: vec![NodeScratch::default(); node_count],
            open_list: Vec::new(),
        }
    }

    /// Pop the open-list node with the lowest f = g + h. The list is kept as
    /// a plain vector, fully sorted descending by f, popped from the back.
    fn next_node(&mut self) -> Option<usize> {
        let scratch = &self.scratch;
        self.open_list.sort_by(|&a, &b| {
            let fa = scratch[a].g + scratch[a].h;
            let fb = scratch[b].g + scratch[b].h;
            fb.partial_cmp(&fa).unwrap_or(Ordering::Equal)
        });
        self.open_list.pop()
    }

    /// Expand `current`: for every road through it, take the nearest
    /// unvisited node on that road's way. A node shared by several roads may
    /// be collected more than once; the second pass just overwrites the same
    /// scratch values.
    fn add_neighbors(&mut self, current: usize, end_pos: Coordinate, model: &RouteModel) {
        let current_pos = model.node(current);

        let mut neighbors = Vec::new();
        for &road in model.roads_through(current) {
            let mut nearest: Option<usize> = None;
            let mut nearest_dist = f64::MAX;
            for &candidate in model.road_way_nodes(road) {
                let dist = current_pos.distance(model.node(candidate));
                if dist == 0.0 || self.scratch[candidate].visited {
                    continue;
                }
                if dist < nearest_dist {
                    nearest_dist = dist;
                    nearest = Some(candidate);
                }
            }
            if let Some(neighbor) = nearest {
                neighbors.push(neighbor);
            }
        }

        for neighbor in neighbors {
            let g = self.scratch[current].g + current_pos.distance(model.node(neighbor));
            let entry = &mut self.scratch[neighbor];
            entry.parent = Some(current);
            entry.g = g;
            entry.h = model.node(neighbor).distance(end_pos);
            entry.visited = true;
            self.open_list.push(neighbor);
        }
    }

    /// Walk parent pointers back from the goal and reverse into start-first
    /// order.
    fn final_path(&self, goal: usize, model: &RouteModel) -> Vec<Coordinate> {
        let mut path = Vec::new();
        let mut current = Some(goal);
        while let Some(index) = current {
            path.push(model.node(index));
            current = self.scratch[index].parent;
        }
        path.reverse();
        path
    }

    fn reset(&mut self) {
        self.open_list.clear();
        for entry in &mut self.scratch {
            *entry = NodeScratch::default();
        }
    }
}

/// Plans routes between map positions. Shared by every actor via `Arc`; the
/// internal mutex makes each search a critical section.
pub struct RoutePlanner {
    model: Arc<RouteModel>,
    search: Mutex<SearchState>,
}

impl RoutePlanner {
    pub fn new(model: Arc<RouteModel>) -> Self {
        let search = Mutex::new(SearchState::new(model.node_count()));
        Self { model, search }
    }

    /// Find a road path from the object's position to its destination and
    /// write it back through [`Routable::set_path`]. When no route exists
    /// the object's path is left empty, which callers treat as
    /// "unreachable".
    pub fn a_star_search(&self, map_obj: &mut dyn Routable) {
        let start_pos = map_obj.position();
        let dest_pos = map_obj.destination();

        let mut search = self.search.lock().expect("route planner mutex poisoned");

        let start = self.model.find_closest_node(start_pos);
        let end = self.model.find_closest_node(dest_pos);
        let end_pos = self.model.node(end);

        search.scratch[start].visited = true;
        search.open_list.push(start);

        let mut goal = None;
        while let Some(current) = search.next_node() {
            if self.model.node(current) == end_pos {
                goal = Some(current);
                break;
            }
            search.add_neighbors(current, end_pos, &self.model);
        }

        if let Some(goal) = goal {
            map_obj.set_path(search.final_path(goal, &self.model));
        }

        search.reset();
    }

    #[cfg(test)]
    fn scratch_is_clean(&self) -> bool {
        let search = self.search.lock().expect("route planner mutex poisoned");
        search.open_list.is_empty()
            && search.scratch.iter().all(|entry| {
                entry.parent.is_none()
                    && entry.g == 0.0
                    && entry.h == f64::INFINITY
                    && !entry.visited
            })
    }
}

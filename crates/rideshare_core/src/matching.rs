//! Matching policies: strategies for pairing the longest-waiting passenger
//! with a vehicle.
//!
//! Policies only choose; the matcher owns all bookkeeping. Candidates arrive
//! pre-filtered (known-unreachable pairs already removed) in ascending
//! vehicle-id order.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::map::Coordinate;
use crate::objects::ObjectId;

/// Which matching policy to run. Parses case-insensitively from the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicyKind {
    Simple,
    #[default]
    Closest,
}

impl FromStr for MatchPolicyKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "simple" => Ok(MatchPolicyKind::Simple),
            "closest" => Ok(MatchPolicyKind::Closest),
            other => Err(format!("unknown match type '{other}'")),
        }
    }
}

/// Select a vehicle for one passenger, or `None` if no candidate is
/// admissible.
pub trait MatchingPolicy: Send + Sync {
    fn select_vehicle(
        &self,
        passenger_pos: Coordinate,
        candidates: &[(ObjectId, Coordinate)],
        close_enough: f64,
    ) -> Option<ObjectId>;
}

/// First admissible vehicle wins, regardless of distance.
#[derive(Debug, Default)]
pub struct SimpleMatch;

impl MatchingPolicy for SimpleMatch {
    fn select_vehicle(
        &self,
        _passenger_pos: Coordinate,
        candidates: &[(ObjectId, Coordinate)],
        _close_enough: f64,
    ) -> Option<ObjectId> {
        candidates.first().map(|&(id, _)| id)
    }
}

/// Take the first vehicle within `close_enough`; failing that, the
/// minimum-distance candidate. Ties keep the earlier (lower-id) vehicle.
#[derive(Debug, Default)]
pub struct ClosestMatch;

impl MatchingPolicy for ClosestMatch {
    fn select_vehicle(
        &self,
        passenger_pos: Coordinate,
        candidates: &[(ObjectId, Coordinate)],
        close_enough: f64,
    ) -> Option<ObjectId> {
        let mut best: Option<(f64, ObjectId)> = None;
        for &(id, position) in candidates {
            let distance = passenger_pos.distance(position);
            if distance <= close_enough {
                return Some(id);
            }
            match best {
                Some((best_distance, _)) if distance >= best_distance => {}
                _ => best = Some((distance, id)),
            }
        }
        best.map(|(_, id)| id)
    }
}

pub fn build_policy(kind: MatchPolicyKind) -> Box<dyn MatchingPolicy> {
    match kind {
        MatchPolicyKind::Simple => Box::new(SimpleMatch),
        MatchPolicyKind::Closest => Box::new(ClosestMatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Coordinate {
        Coordinate { x, y }
    }

    #[test]
    fn match_type_parses_case_insensitively() {
        assert_eq!(
            "Closest".parse::<MatchPolicyKind>(),
            Ok(MatchPolicyKind::Closest)
        );
        assert_eq!(
            "SIMPLE".parse::<MatchPolicyKind>(),
            Ok(MatchPolicyKind::Simple)
        );
        assert!("nearest".parse::<MatchPolicyKind>().is_err());
    }

    #[test]
    fn simple_takes_the_first_candidate() {
        let candidates = vec![(4, at(9.0, 9.0)), (7, at(0.0, 0.0))];
        let chosen = SimpleMatch.select_vehicle(at(0.0, 0.0), &candidates, 1.0);
        assert_eq!(chosen, Some(4));
    }

    #[test]
    fn simple_with_no_candidates_matches_nothing() {
        assert_eq!(SimpleMatch.select_vehicle(at(0.0, 0.0), &[], 1.0), None);
    }

    #[test]
    fn closest_accepts_the_first_close_enough_vehicle() {
        let candidates = vec![(1, at(5.0, 0.0)), (2, at(0.5, 0.0)), (3, at(0.1, 0.0))];
        // Vehicle 2 is within range and checked before the even closer 3.
        let chosen = ClosestMatch.select_vehicle(at(0.0, 0.0), &candidates, 0.5);
        assert_eq!(chosen, Some(2));
    }

    #[test]
    fn close_enough_boundary_counts_as_admissible() {
        let candidates = vec![(1, at(0.5, 0.0))];
        let chosen = ClosestMatch.select_vehicle(at(0.0, 0.0), &candidates, 0.5);
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn closest_falls_back_to_minimum_distance() {
        let candidates = vec![(1, at(5.0, 0.0)), (2, at(3.0, 0.0)), (3, at(4.0, 0.0))];
        let chosen = ClosestMatch.select_vehicle(at(0.0, 0.0), &candidates, 0.5);
        assert_eq!(chosen, Some(2));
    }

    #[test]
    fn closest_tie_keeps_the_earlier_vehicle() {
        let candidates = vec![(1, at(0.0, 3.0)), (2, at(3.0, 0.0))];
        let chosen = ClosestMatch.select_vehicle(at(0.0, 0.0), &candidates, 0.5);
        assert_eq!(chosen, Some(1));
    }
}

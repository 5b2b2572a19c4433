// Shared fixtures for unit tests.

use std::collections::BTreeMap;

use crate::config::EngineConfig;

/// Five roles, team size 5, global average 4000.
pub(crate) fn engine_config() -> EngineConfig {
    EngineConfig {
        global_average_rating: 4000.0,
        team_size: 5,
        roles: ["carry", "mid", "offlane", "soft_support", "hard_support"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        default_teams: Vec::new(),
        role_preference_weights: BTreeMap::from([(1, 0.9), (2, 0.6), (3, 0.1)]),
        logistic_midpoint: 0.1,
        logistic_slope: 5.0,
        blend_alpha: 0.5,
        randomness_by_team_fill: BTreeMap::from([(0, 0.5), (1, 0.4), (2, 0.3), (3, 0.2), (4, 0.1)]),
        default_randomness: 0.3,
    }
}

pub(crate) fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

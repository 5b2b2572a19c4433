// Probability engine: turns a role pool into a normalized lottery distribution.
//
// Each candidate's weight blends how close their rating is to the team's
// ideal next pick (logistic curve over the relative distance) with how much
// they want the role. A uniform floor keyed on roster size is then mixed in,
// so early picks are looser and late picks are driven by rating.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::draft::player::PlayerRegistry;
use crate::draft::pool::RolePools;
use crate::draft::team::Team;

use super::balance::ideal_rating;

/// Tolerance within which a distribution must sum to 1.
pub const SUM_TOLERANCE: f64 = 1e-8;

/// Player -> probability, in role-pool order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    entries: Vec<(String, f64)>,
}

impl Distribution {
    pub fn from_entries(entries: Vec<(String, f64)>) -> Self {
        Distribution { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), *p))
    }

    pub fn get(&self, player: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == player)
            .map(|(_, p)| *p)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }
}

/// How one candidate's probability was derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateWeight {
    pub player: String,
    pub rating: f64,
    pub priority: u32,
    /// |rating - ideal| / ideal; infinite when the ideal is not positive.
    pub ratio: f64,
    pub mmr_weight: f64,
    pub preference: f64,
    pub raw_weight: f64,
    pub probability: f64,
}

/// Logistic closeness weight: 1 at ratio far below the midpoint, 0.5 at the
/// midpoint, approaching 0 beyond it (for a positive slope).
pub fn logistic_weight(ratio: f64, midpoint: f64, slope: f64) -> f64 {
    let z = slope * (ratio - midpoint);
    if z.is_nan() {
        // slope 0 with an infinite ratio: the curve is flat.
        return 0.5;
    }
    1.0 / (1.0 + z.exp())
}

fn blend(mmr_weight: f64, preference: f64, alpha: f64) -> f64 {
    if alpha >= 1.0 {
        mmr_weight * preference
    } else {
        alpha * mmr_weight + (1.0 - alpha) * preference
    }
}

/// Probability of each eligible candidate in `role`'s pool being drawn for `team`.
///
/// Empty when the pool is empty or nobody in it weights the role above zero.
/// The engine never substitutes another role.
pub fn compute(
    team: &Team,
    role: &str,
    config: &EngineConfig,
    pools: &RolePools,
    players: &PlayerRegistry,
) -> Distribution {
    let entries = explain(team, role, config, pools, players)
        .into_iter()
        .map(|c| (c.player, c.probability))
        .collect();
    Distribution::from_entries(entries)
}

/// Same as [`compute`], keeping the per-candidate breakdown.
pub fn explain(
    team: &Team,
    role: &str,
    config: &EngineConfig,
    pools: &RolePools,
    players: &PlayerRegistry,
) -> Vec<CandidateWeight> {
    let candidates = pools.candidates(role);
    if candidates.is_empty() {
        return Vec::new();
    }

    let ideal = ideal_rating(team, config);

    let mut weights: Vec<CandidateWeight> = candidates
        .iter()
        .filter_map(|name| {
            let player = players.get(name)?;
            let priority = player.priority_for(role)?;
            let preference = config.preference_weight(priority);
            if preference <= 0.0 {
                return None;
            }

            let ratio = if ideal > 0.0 {
                (player.rating - ideal).abs() / ideal
            } else {
                f64::INFINITY
            };
            let mmr_weight =
                logistic_weight(ratio, config.logistic_midpoint, config.logistic_slope);

            Some(CandidateWeight {
                player: player.name.clone(),
                rating: player.rating,
                priority,
                ratio,
                mmr_weight,
                preference,
                raw_weight: blend(mmr_weight, preference, config.blend_alpha),
                probability: 0.0,
            })
        })
        .collect();

    if weights.is_empty() {
        return weights;
    }

    let n = weights.len() as f64;
    let total: f64 = weights.iter().map(|w| w.raw_weight).sum();
    let base_randomness = config.base_randomness(team.len());

    for w in &mut weights {
        // Uniform over the retained candidates when every weight collapsed to 0.
        let share = if total > 0.0 { w.raw_weight / total } else { 1.0 / n };
        w.probability = share * (1.0 - base_randomness) + base_randomness / n;
    }

    let sum: f64 = weights.iter().map(|w| w.probability).sum();
    if sum > 0.0 {
        for w in &mut weights {
            w.probability /= sum;
        }
    }

    debug_assert!(
        (weights.iter().map(|w| w.probability).sum::<f64>() - 1.0).abs() < SUM_TOLERANCE,
        "distribution for role {role} does not sum to 1"
    );

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::{parse_role_priorities, PlayerRecord};
    use crate::draft::team::AssignedRole;
    use crate::test_support::{approx_eq, engine_config};

    fn setup(players: &[(&str, f64, &str)]) -> (RolePools, PlayerRegistry) {
        let config = engine_config();
        let records: Vec<PlayerRecord> = players
            .iter()
            .map(|(n, r, roles)| PlayerRecord::new(*n, *r, parse_role_priorities(roles).unwrap()))
            .collect();
        let mut pools = RolePools::new(&config.roles);
        for p in &records {
            pools.insert(p);
        }
        (pools, PlayerRegistry::from_records(records).unwrap())
    }

    fn scenario_config() -> EngineConfig {
        let mut config = engine_config();
        config.global_average_rating = 4000.0;
        config.logistic_midpoint = 0.1;
        config.logistic_slope = 5.0;
        config.blend_alpha = 1.0;
        config.randomness_by_team_fill.clear();
        config.default_randomness = 0.0;
        config
    }

    #[test]
    fn closest_rating_wins_most_weight() {
        let (pools, players) = setup(&[
            ("A", 3000.0, "mid(1)"),
            ("B", 4000.0, "mid(1)"),
            ("C", 5000.0, "mid(1)"),
        ]);
        let config = scenario_config();
        let team = Team::new("t");

        let dist = compute(&team, "mid", &config, &pools, &players);
        let (a, b, c) = (
            dist.get("A").unwrap(),
            dist.get("B").unwrap(),
            dist.get("C").unwrap(),
        );
        assert!(b > a);
        assert!(approx_eq(a, c, 1e-12));
        assert!(approx_eq(dist.total(), 1.0, SUM_TOLERANCE));
    }

    #[test]
    fn breakdown_reports_ratio_and_logistic_weight() {
        let (pools, players) = setup(&[("A", 3000.0, "mid(1)"), ("B", 4000.0, "mid(1)")]);
        let config = scenario_config();
        let rows = explain(&Team::new("t"), "mid", &config, &pools, &players);

        assert_eq!(rows[0].player, "A");
        assert!(approx_eq(rows[0].ratio, 0.25, 1e-12));
        assert!(approx_eq(rows[1].ratio, 0.0, 1e-12));
        let expected_b = 1.0 / (1.0 + (5.0f64 * -0.1).exp());
        assert!(approx_eq(rows[1].mmr_weight, expected_b, 1e-12));
        assert!(approx_eq(rows[1].raw_weight, expected_b * 0.9, 1e-12));
    }

    #[test]
    fn empty_pool_yields_empty_distribution() {
        let (pools, players) = setup(&[("A", 3000.0, "mid(1)")]);
        let dist = compute(&Team::new("t"), "carry", &engine_config(), &pools, &players);
        assert!(dist.is_empty());
    }

    #[test]
    fn unweighted_priority_is_excluded() {
        // Priority 4 has no weight in the table, so D never enters the lottery.
        let (pools, players) = setup(&[("A", 3000.0, "mid(1)"), ("D", 4000.0, "mid(4)")]);
        let dist = compute(&Team::new("t"), "mid", &engine_config(), &pools, &players);
        assert_eq!(dist.len(), 1);
        assert!(dist.get("D").is_none());
        assert!(approx_eq(dist.get("A").unwrap(), 1.0, SUM_TOLERANCE));
    }

    #[test]
    fn all_excluded_yields_empty_distribution() {
        let (pools, players) = setup(&[("D", 4000.0, "mid(4)"), ("E", 4100.0, "mid(7)")]);
        let dist = compute(&Team::new("t"), "mid", &engine_config(), &pools, &players);
        assert!(dist.is_empty());
    }

    #[test]
    fn preference_shifts_probability_at_equal_rating() {
        let (pools, players) = setup(&[("A", 4000.0, "mid(1)"), ("B", 4000.0, "mid(3)")]);
        let mut config = scenario_config();
        config.blend_alpha = 0.5;
        let dist = compute(&Team::new("t"), "mid", &config, &pools, &players);
        assert!(dist.get("A").unwrap() > dist.get("B").unwrap());
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        // A full team has no ideal rating; with alpha = 1 and a steep curve
        // every product weight is 0.
        let (pools, players) = setup(&[
            ("A", 3000.0, "mid(1)"),
            ("B", 5000.0, "mid(2)"),
            ("C", 4000.0, "carry(1)"),
        ]);
        let mut config = scenario_config();
        config.team_size = 1;
        let mut team = Team::new("t");
        team.push("C", AssignedRole::Role("carry".into()), &players);

        let dist = compute(&team, "mid", &config, &pools, &players);
        assert_eq!(dist.len(), 2);
        assert!(approx_eq(dist.get("A").unwrap(), 0.5, 1e-12));
        assert!(approx_eq(dist.get("B").unwrap(), 0.5, 1e-12));
    }

    #[test]
    fn randomness_floor_keeps_outliers_in_play() {
        let (pools, players) = setup(&[("A", 4000.0, "mid(1)"), ("Z", 40000.0, "mid(1)")]);
        let mut config = scenario_config();
        config.default_randomness = 0.5;
        let dist = compute(&Team::new("t"), "mid", &config, &pools, &players);
        // Z's own weight is ~0, so it keeps just the floor share 0.5 / 2.
        assert!(dist.get("Z").unwrap() >= 0.25 - 1e-9);
        assert!(approx_eq(dist.total(), 1.0, SUM_TOLERANCE));
    }

    #[test]
    fn floor_shrinks_as_team_fills() {
        let (pools, players) = setup(&[
            ("A", 4000.0, "mid(1)"),
            ("Z", 40000.0, "mid(1)"),
            ("C", 4000.0, "carry(1)"),
        ]);
        let mut config = scenario_config();
        config.randomness_by_team_fill.insert(0, 0.5);
        config.randomness_by_team_fill.insert(1, 0.1);

        let empty = Team::new("t");
        let early = compute(&empty, "mid", &config, &pools, &players);

        let mut filled = Team::new("u");
        filled.push("C", AssignedRole::Role("carry".into()), &players);
        let late = compute(&filled, "mid", &config, &pools, &players);

        assert!(late.get("Z").unwrap() < early.get("Z").unwrap());
    }

    #[test]
    fn distribution_sums_to_one_across_team_states() {
        let (pools, players) = setup(&[
            ("A", 1200.0, "mid(1)|carry(2)"),
            ("B", 2600.0, "mid(2)"),
            ("C", 4100.0, "mid(3)|offlane(1)"),
            ("D", 6900.0, "mid(1)"),
            ("E", 9800.0, "carry(1)|mid(2)"),
        ]);
        let config = engine_config();
        let mut team = Team::new("t");
        for (name, role) in [("E", "carry"), ("C", "offlane")] {
            let dist = compute(&team, "mid", &config, &pools, &players);
            assert!(approx_eq(dist.total(), 1.0, SUM_TOLERANCE));
            team.push(name, AssignedRole::Role(role.into()), &players);
        }
    }

    #[test]
    fn logistic_is_centered_on_midpoint() {
        assert!(approx_eq(logistic_weight(0.1, 0.1, 5.0), 0.5, 1e-12));
        assert!(logistic_weight(0.0, 0.1, 5.0) > 0.5);
        assert!(logistic_weight(1.0, 0.1, 5.0) < 0.5);
        assert_eq!(logistic_weight(f64::INFINITY, 0.1, 5.0), 0.0);
        assert_eq!(logistic_weight(f64::INFINITY, 0.1, 0.0), 0.5);
    }
}

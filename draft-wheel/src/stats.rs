// Read-only aggregates over the undrafted pool, for charts and `stats`.

use serde::Serialize;

use crate::draft::player::PlayerRecord;
use crate::draft::state::DraftState;

pub const CORE_ROLES: [&str; 3] = ["carry", "mid", "offlane"];
pub const SUPPORT_ROLES: [&str; 2] = ["soft_support", "hard_support"];

/// Rating band `[min, end)`. `end: None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingBucket {
    pub label: &'static str,
    pub min: f64,
    pub end: Option<f64>,
}

impl RatingBucket {
    pub fn contains(&self, rating: f64) -> bool {
        rating >= self.min && self.end.map_or(true, |end| rating < end)
    }
}

/// Contiguous bands: every rating from 2000 up lands in exactly one.
pub const DEFAULT_RATING_BUCKETS: [RatingBucket; 5] = [
    RatingBucket { label: "2k-3.5k", min: 2000.0, end: Some(3501.0) },
    RatingBucket { label: "3.5k-5k", min: 3501.0, end: Some(5001.0) },
    RatingBucket { label: "5k-6.5k", min: 5001.0, end: Some(6501.0) },
    RatingBucket { label: "6.5k-8k", min: 6501.0, end: Some(8001.0) },
    RatingBucket { label: ">8000", min: 8001.0, end: None },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub core_only: usize,
    pub support_only: usize,
    pub mixed: usize,
}

impl BucketCount {
    pub fn total(&self) -> usize {
        self.core_only + self.support_only + self.mixed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDistribution {
    pub role: String,
    pub count: usize,
    /// 0 when the pool is empty.
    pub average_rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleMix {
    CoreOnly,
    SupportOnly,
    Mixed,
}

fn role_mix(player: &PlayerRecord) -> RoleMix {
    let mut roles = player.roles().peekable();
    if roles.peek().is_none() {
        return RoleMix::Mixed;
    }
    let roles: Vec<&str> = roles.collect();
    if roles.iter().all(|r| CORE_ROLES.contains(r)) {
        RoleMix::CoreOnly
    } else if roles.iter().all(|r| SUPPORT_ROLES.contains(r)) {
        RoleMix::SupportOnly
    } else {
        RoleMix::Mixed
    }
}

/// Undrafted players per rating bucket, split by the kind of roles they list.
///
/// A player lands in the first bucket that contains their rating; players
/// below the lowest band are not counted.
pub fn rating_bucket_counts(state: &DraftState, buckets: &[RatingBucket]) -> Vec<BucketCount> {
    let mut counts: Vec<BucketCount> = buckets
        .iter()
        .map(|b| BucketCount {
            label: b.label.to_string(),
            core_only: 0,
            support_only: 0,
            mixed: 0,
        })
        .collect();

    for player in state.undrafted_players() {
        let Some(idx) = buckets.iter().position(|b| b.contains(player.rating)) else {
            continue;
        };
        let slot = &mut counts[idx];
        match role_mix(player) {
            RoleMix::CoreOnly => slot.core_only += 1,
            RoleMix::SupportOnly => slot.support_only += 1,
            RoleMix::Mixed => slot.mixed += 1,
        }
    }

    counts
}

/// Candidate count and mean rating of each configured role's pool.
pub fn role_distribution_counts(state: &DraftState) -> Vec<RoleDistribution> {
    state
        .config()
        .roles
        .iter()
        .map(|role| {
            let ratings: Vec<f64> = state
                .pools()
                .candidates(role)
                .iter()
                .filter_map(|name| state.players().rating(name))
                .collect();
            let count = ratings.len();
            let average_rating = if count == 0 {
                0.0
            } else {
                ratings.iter().sum::<f64>() / count as f64
            };
            RoleDistribution {
                role: role.clone(),
                count,
                average_rating,
            }
        })
        .collect()
}

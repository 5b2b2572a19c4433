// Rating the next pick should have to keep a team on target.

use crate::config::EngineConfig;
use crate::draft::team::Team;

/// The rating a team's next pick should have so that the finished team
/// averages `global_average_rating`.
///
/// Returns 0 for a full (or overfull) team. Always computed from the
/// current roster; never cache the result across picks.
pub fn ideal_rating(team: &Team, config: &EngineConfig) -> f64 {
    let filled = team.len();
    let picks_left = match config.team_size.checked_sub(filled) {
        Some(n) if n > 0 => n,
        _ => return 0.0,
    };

    let target_total = config.team_size as f64 * config.global_average_rating;
    let remaining_budget = target_total - team.average_rating() * filled as f64;
    remaining_budget / picks_left as f64
}

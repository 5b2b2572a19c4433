// Team rosters and their derived average rating.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::PlayerRegistry;

/// Sentinel written in place of a role for captains.
pub const CAPTAIN_MARKER: &str = "(Captain)";

/// The role a roster entry was drafted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignedRole {
    Role(String),
    /// Added directly, bypassing the lottery.
    Captain,
}

impl AssignedRole {
    /// Parse a stored role; the captain sentinel is matched case-insensitively.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case(CAPTAIN_MARKER) {
            AssignedRole::Captain
        } else {
            AssignedRole::Role(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssignedRole::Role(role) => role,
            AssignedRole::Captain => CAPTAIN_MARKER,
        }
    }
}

impl fmt::Display for AssignedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A drafted player and the role they fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: String,
    pub role: AssignedRole,
}

/// One competing roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    players: Vec<RosterEntry>,
    average_rating: f64,
}

impl Team {
    pub fn new(id: impl Into<String>) -> Self {
        Team {
            id: id.into(),
            players: Vec::new(),
            average_rating: 0.0,
        }
    }

    pub fn players(&self) -> &[RosterEntry] {
        &self.players
    }

    /// Mean rating of the roster; 0 for an empty team.
    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|e| e.player == name)
    }

    /// Whether some entry was drafted into `role`.
    pub fn has_role_filled(&self, role: &str) -> bool {
        self.players
            .iter()
            .any(|e| matches!(&e.role, AssignedRole::Role(r) if r == role))
    }

    /// Append an entry and refresh the average.
    pub fn push(&mut self, player: &str, role: AssignedRole, registry: &PlayerRegistry) {
        self.players.push(RosterEntry {
            player: player.to_string(),
            role,
        });
        self.recompute_average(registry);
    }

    /// Remove the first entry matching `(player, role)` exactly and refresh the
    /// average. Returns false if no entry matched.
    pub fn remove(&mut self, player: &str, role: &AssignedRole, registry: &PlayerRegistry) -> bool {
        let Some(idx) = self
            .players
            .iter()
            .position(|e| e.player == player && e.role == *role)
        else {
            return false;
        };
        self.players.remove(idx);
        self.recompute_average(registry);
        true
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.average_rating = 0.0;
    }

    /// Sum of entry ratings. Players missing from the registry count as 0.
    pub fn rating_sum(&self, registry: &PlayerRegistry) -> f64 {
        self.players
            .iter()
            .map(|e| registry.rating(&e.player).unwrap_or(0.0))
            .sum()
    }

    fn recompute_average(&mut self, registry: &PlayerRegistry) {
        self.average_rating = if self.players.is_empty() {
            0.0
        } else {
            self.rating_sum(registry) / self.players.len() as f64
        };
    }
}

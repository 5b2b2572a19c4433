// Role -> undrafted player index.

use std::collections::HashMap;

use serde::Serialize;

use super::player::PlayerRecord;

/// Undrafted players grouped by the roles they listed.
///
/// A name is in the pool for role R iff the player lists R and is on no team.
/// Within a role, names keep insertion order so segment layout is reproducible.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RolePools {
    members: HashMap<String, Vec<String>>,
}

impl RolePools {
    /// Create an empty pool for each configured role.
    pub fn new(roles: &[String]) -> Self {
        RolePools {
            members: roles.iter().map(|r| (r.clone(), Vec::new())).collect(),
        }
    }

    /// Undrafted candidates for `role`, in insertion order. Unknown roles are empty.
    pub fn candidates(&self, role: &str) -> &[String] {
        self.members.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self, role: &str) -> bool {
        self.candidates(role).is_empty()
    }

    pub fn contains(&self, role: &str, name: &str) -> bool {
        self.candidates(role).iter().any(|n| n == name)
    }

    /// Whether the player is in any role's pool.
    pub fn contains_anywhere(&self, name: &str) -> bool {
        self.members.values().any(|names| names.iter().any(|n| n == name))
    }

    /// Add the player to the pool of every role they list. Roles outside the
    /// configured set are ignored; callers validate those before inserting.
    pub fn insert(&mut self, player: &PlayerRecord) {
        for role in player.roles() {
            if let Some(names) = self.members.get_mut(role) {
                if !names.iter().any(|n| *n == player.name) {
                    names.push(player.name.clone());
                }
            }
        }
    }

    /// Remove the player from every role's pool. Returns true if anything was removed.
    pub fn remove_everywhere(&mut self, name: &str) -> bool {
        let mut removed = false;
        for names in self.members.values_mut() {
            let before = names.len();
            names.retain(|n| n != name);
            removed |= names.len() != before;
        }
        removed
    }

    /// Total number of undrafted (role, player) memberships.
    pub fn membership_count(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }
}

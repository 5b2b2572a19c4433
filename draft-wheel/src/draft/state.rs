// Draft state: players, role pools, teams and the undo history.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::lottery::{self, CandidateWeight, Distribution, Segment};
use crate::persistence::{DraftSnapshot, PersistenceError, SnapshotStore, TeamAssignment};

use super::player::{DataFormatError, PlayerRecord, PlayerRegistry, RolePriority};
use super::pool::RolePools;
use super::team::{AssignedRole, Team};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("unknown team `{0}`")]
    UnknownTeam(String),

    #[error("unknown role `{0}`")]
    UnknownRole(String),

    #[error("player `{0}` is already on a team")]
    AlreadyDrafted(String),

    #[error(transparent)]
    Data(#[from] DataFormatError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// One undoable unit of history: a lottery pick or a captain add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEvent {
    pub team_id: String,
    pub player_name: String,
    /// The role the caller asked to fill, or the captain marker.
    pub role: AssignedRole,
    pub recorded_at: DateTime<Utc>,
}

/// The complete state of one draft.
///
/// All mutation goes through these methods so that a player is always either
/// in the role pools or on exactly one team, never both.
#[derive(Debug, Clone)]
pub struct DraftState {
    config: EngineConfig,
    players: PlayerRegistry,
    pools: RolePools,
    /// Registration order.
    teams: Vec<Team>,
    /// LIFO; one entry per successful pick or captain add since the last load.
    history: Vec<DraftEvent>,
}

impl DraftState {
    /// Create an empty draft. The config is validated here so that bad tuning
    /// never surfaces at pick time.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut state = DraftState {
            pools: RolePools::new(&config.roles),
            config,
            players: PlayerRegistry::new(),
            teams: Vec::new(),
            history: Vec::new(),
        };
        state.register_default_teams();
        Ok(state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn pools(&self) -> &RolePools {
        &self.pools
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    pub fn history(&self) -> &[DraftEvent] {
        &self.history
    }

    /// Register a new, empty team. Returns false if the id is already taken.
    pub fn register_team(&mut self, team_id: &str) -> bool {
        if self.team(team_id).is_some() {
            return false;
        }
        self.teams.push(Team::new(team_id));
        true
    }

    fn register_default_teams(&mut self) {
        for id in self.config.default_teams.clone() {
            self.register_team(&id);
        }
    }

    fn team_index(&self, team_id: &str) -> Result<usize, DraftError> {
        self.teams
            .iter()
            .position(|t| t.id == team_id)
            .ok_or_else(|| DraftError::UnknownTeam(team_id.to_string()))
    }

    fn require_role(&self, role: &str) -> Result<(), DraftError> {
        if self.config.has_role(role) {
            Ok(())
        } else {
            Err(DraftError::UnknownRole(role.to_string()))
        }
    }

    fn check_known_roles(&self, player: &PlayerRecord) -> Result<(), DataFormatError> {
        match player.roles().find(|r| !self.config.has_role(r)) {
            Some(role) => Err(DataFormatError::UnknownRole {
                player: player.name.clone(),
                role: role.to_string(),
            }),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Pool loading
    // -----------------------------------------------------------------------

    /// Replace the player pool. Every roster is emptied and the history is
    /// cleared. Nothing changes if any record is rejected.
    pub fn load_pool(&mut self, records: Vec<PlayerRecord>) -> Result<(), DraftError> {
        for (i, record) in records.iter().enumerate() {
            self.check_known_roles(record).map_err(|e| e.at_row(i + 1))?;
        }
        let players = PlayerRegistry::from_records(records)?;

        let mut pools = RolePools::new(&self.config.roles);
        for player in players.iter() {
            pools.insert(player);
        }

        self.players = players;
        self.pools = pools;
        for team in &mut self.teams {
            team.clear();
        }
        self.history.clear();
        self.register_default_teams();

        info!(
            "Loaded {} players into {} role pools",
            self.players.len(),
            self.config.roles.len()
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lottery preview
    // -----------------------------------------------------------------------

    /// Rating the team's next pick should have.
    pub fn ideal_rating(&self, team_id: &str) -> Result<f64, DraftError> {
        let idx = self.team_index(team_id)?;
        Ok(lottery::ideal_rating(&self.teams[idx], &self.config))
    }

    /// Randomness floor currently applied to the team's lottery.
    pub fn base_randomness(&self, team_id: &str) -> Result<f64, DraftError> {
        let idx = self.team_index(team_id)?;
        Ok(self.config.base_randomness(self.teams[idx].len()))
    }

    /// Lottery odds for filling `role` on `team_id` from the current pool.
    ///
    /// An empty distribution means no eligible candidates; picking a fallback
    /// role is up to the caller.
    pub fn compute(&self, team_id: &str, role: &str) -> Result<Distribution, DraftError> {
        let idx = self.team_index(team_id)?;
        self.require_role(role)?;
        Ok(lottery::compute(
            &self.teams[idx],
            role,
            &self.config,
            &self.pools,
            &self.players,
        ))
    }

    /// Per-candidate breakdown of [`DraftState::compute`].
    pub fn explain(&self, team_id: &str, role: &str) -> Result<Vec<CandidateWeight>, DraftError> {
        let idx = self.team_index(team_id)?;
        self.require_role(role)?;
        Ok(lottery::explain(
            &self.teams[idx],
            role,
            &self.config,
            &self.pools,
            &self.players,
        ))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Commit the lottery result at `position`.
    ///
    /// `segments` must come from a fresh `compute(team_id, candidate_role)`.
    /// The winner is drafted into `requested_role` even when the draw ran on a
    /// fallback `candidate_role`, and the history records `requested_role`.
    ///
    /// Returns `Ok(None)` without touching state when the position hits no
    /// segment or the winner has left `candidate_role`'s pool since the
    /// segments were built.
    pub fn pick(
        &mut self,
        team_id: &str,
        requested_role: &str,
        candidate_role: &str,
        position: f64,
        segments: &[Segment],
    ) -> Result<Option<String>, DraftError> {
        let idx = self.team_index(team_id)?;
        self.require_role(requested_role)?;
        self.require_role(candidate_role)?;

        let Some(winner) = lottery::resolve(position, segments) else {
            debug!("Position {position} matched no segment for team {team_id}");
            return Ok(None);
        };
        if !self.pools.contains(candidate_role, winner) {
            warn!(
                "Rejected stale pick: {} is no longer in the {} pool",
                winner, candidate_role
            );
            return Ok(None);
        }
        let winner = winner.to_string();

        self.pools.remove_everywhere(&winner);
        let role = AssignedRole::Role(requested_role.to_string());
        self.teams[idx].push(&winner, role.clone(), &self.players);
        self.history.push(DraftEvent {
            team_id: team_id.to_string(),
            player_name: winner.clone(),
            role,
            recorded_at: Utc::now(),
        });

        info!(
            "Team {} drafted {} as {} (drawn from {} at {:.3})",
            team_id, winner, requested_role, candidate_role, position
        );
        Ok(Some(winner))
    }

    /// Compute, lay out and commit a draw in one exclusive step, so the pool
    /// cannot change between preview and commit.
    pub fn spin(
        &mut self,
        team_id: &str,
        requested_role: &str,
        candidate_role: &str,
        position: f64,
    ) -> Result<Option<String>, DraftError> {
        let distribution = self.compute(team_id, candidate_role)?;
        let segments = lottery::build_segments(&distribution);
        self.pick(team_id, requested_role, candidate_role, position, &segments)
    }

    /// Put a captain straight onto a team, bypassing the lottery.
    ///
    /// Unknown teams are registered. Unknown players are created with every
    /// configured role at priority 1 so undo can return them to the pools.
    /// `rating` only applies to newly created players.
    pub fn add_captain(&mut self, team_id: &str, name: &str, rating: f64) -> Result<(), DraftError> {
        if self.teams.iter().any(|t| t.has_player(name)) {
            return Err(DraftError::AlreadyDrafted(name.to_string()));
        }

        if !self.players.contains(name) {
            let roles = self
                .config
                .roles
                .iter()
                .map(|r| RolePriority::new(r.clone(), 1))
                .collect();
            self.players.insert(PlayerRecord::new(name, rating, roles))?;
        }

        if self.register_team(team_id) {
            info!("Registered team {} for captain {}", team_id, name);
        }
        let idx = self.team_index(team_id)?;

        self.pools.remove_everywhere(name);
        self.teams[idx].push(name, AssignedRole::Captain, &self.players);
        self.history.push(DraftEvent {
            team_id: team_id.to_string(),
            player_name: name.to_string(),
            role: AssignedRole::Captain,
            recorded_at: Utc::now(),
        });

        info!("Added captain {} to team {}", name, team_id);
        Ok(())
    }

    /// Reverse the most recent pick or captain add.
    ///
    /// The player returns to the pool of every role they list, not just the
    /// one they were drafted for. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<String> {
        let event = self.history.pop()?;

        if let Some(team) = self.teams.iter_mut().find(|t| t.id == event.team_id) {
            if !team.remove(&event.player_name, &event.role, &self.players) {
                warn!(
                    "Undo found no ({}, {}) entry on team {}",
                    event.player_name, event.role, event.team_id
                );
            }
        } else {
            warn!("Undo references missing team {}", event.team_id);
        }

        if let Some(player) = self.players.get(&event.player_name) {
            self.pools.insert(player);
        }

        info!(
            "Undid {} ({}) from team {}",
            event.player_name, event.role, event.team_id
        );
        Some(event.player_name)
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    /// Names of every player currently on a team.
    pub fn drafted_names(&self) -> HashSet<&str> {
        self.teams
            .iter()
            .flat_map(|t| t.players().iter().map(|e| e.player.as_str()))
            .collect()
    }

    /// Known players on no team, in load order.
    pub fn undrafted_players(&self) -> impl Iterator<Item = &PlayerRecord> {
        let drafted = self.drafted_names();
        self.players
            .iter()
            .filter(move |p| !drafted.contains(p.name.as_str()))
    }

    /// Mean rating of all undrafted players; 0 when there are none.
    pub fn pool_average_rating(&self) -> f64 {
        mean(self.undrafted_players().map(|p| p.rating))
    }

    /// Mean rating of all players currently on teams; 0 when there are none.
    pub fn drafted_average_rating(&self) -> f64 {
        mean(self.teams.iter().flat_map(|t| {
            t.players()
                .iter()
                .filter_map(move |e| self.players.rating(&e.player))
        }))
    }

    pub fn is_role_empty(&self, role: &str) -> bool {
        self.pools.is_empty(role)
    }

    /// Configured roles the team has not drafted anyone into yet.
    pub fn unfilled_roles(&self, team_id: &str) -> Result<Vec<String>, DraftError> {
        let idx = self.team_index(team_id)?;
        let team = &self.teams[idx];
        Ok(self
            .config
            .roles
            .iter()
            .filter(|r| !team.has_role_filled(r))
            .cloned()
            .collect())
    }

    /// Undrafted candidates per configured role, highest rating first.
    pub fn players_by_role(&self) -> Vec<(String, Vec<String>)> {
        self.config
            .roles
            .iter()
            .map(|role| {
                let mut names: Vec<&str> =
                    self.pools.candidates(role).iter().map(String::as_str).collect();
                names.sort_by(|a, b| {
                    let ra = self.players.rating(a).unwrap_or(0.0);
                    let rb = self.players.rating(b).unwrap_or(0.0);
                    rb.total_cmp(&ra)
                });
                (role.clone(), names.into_iter().map(String::from).collect())
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Flat view of the draft: undrafted players plus one row per roster entry.
    pub fn snapshot(&self) -> DraftSnapshot {
        let remaining = self.undrafted_players().cloned().collect();
        let assignments = self
            .teams
            .iter()
            .flat_map(|team| {
                team.players().iter().map(move |entry| {
                    let record = self.players.get(&entry.player);
                    TeamAssignment {
                        team_id: team.id.clone(),
                        name: entry.player.clone(),
                        assigned_role: entry.role.clone(),
                        rating: record.map(|p| p.rating).unwrap_or(0.0),
                        role_priorities: record
                            .map(|p| p.role_priorities.clone())
                            .unwrap_or_default(),
                    }
                })
            })
            .collect();
        DraftSnapshot {
            remaining,
            assignments,
        }
    }

    /// Replace players, pools and teams with the snapshot's contents.
    ///
    /// The history is cleared: undo does not survive a save/load cycle. The
    /// whole snapshot is validated before anything is replaced. Configured
    /// default teams come first, in config order, then any other team in the
    /// order it first appears in the snapshot.
    pub fn restore(&mut self, snapshot: DraftSnapshot) -> Result<(), DraftError> {
        for (i, record) in snapshot.remaining.iter().enumerate() {
            self.check_known_roles(record).map_err(|e| e.at_row(i + 1))?;
        }
        let mut players = PlayerRegistry::from_records(snapshot.remaining)?;

        let mut pools = RolePools::new(&self.config.roles);
        for player in players.iter() {
            pools.insert(player);
        }

        let mut teams: Vec<Team> = self.config.default_teams.iter().map(Team::new).collect();
        for (i, assignment) in snapshot.assignments.into_iter().enumerate() {
            let row = i + 1;
            if let AssignedRole::Role(role) = &assignment.assigned_role {
                if !self.config.has_role(role) {
                    return Err(DataFormatError::UnknownRole {
                        player: assignment.name,
                        role: role.clone(),
                    }
                    .at_row(row)
                    .into());
                }
            }

            let record = PlayerRecord::new(
                assignment.name.clone(),
                assignment.rating,
                assignment.role_priorities,
            );
            self.check_known_roles(&record).map_err(|e| e.at_row(row))?;
            players.insert(record).map_err(|e| e.at_row(row))?;

            let team = match teams.iter_mut().position(|t| t.id == assignment.team_id) {
                Some(idx) => &mut teams[idx],
                None => {
                    teams.push(Team::new(assignment.team_id.clone()));
                    let last = teams.len() - 1;
                    &mut teams[last]
                }
            };
            team.push(&assignment.name, assignment.assigned_role, &players);
        }

        self.players = players;
        self.pools = pools;
        self.teams = teams;
        self.history.clear();

        info!(
            "Restored draft: {} undrafted players, {} teams",
            self.pools.membership_count(),
            self.teams.len()
        );
        Ok(())
    }

    pub fn save_to(&self, store: &dyn SnapshotStore) -> Result<(), DraftError> {
        store.save(&self.snapshot())?;
        info!("Draft saved ({} picks in history)", self.history.len());
        Ok(())
    }

    pub fn load_from(&mut self, store: &dyn SnapshotStore) -> Result<(), DraftError> {
        let snapshot = store.load()?;
        self.restore(snapshot)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// Two-file CSV snapshot of a draft: the remaining pool and the team assignments.
//
// Remaining-pool file: `name,mmr,roles` with roles as `role(priority)|...`.
// Team-assignment file: `team_id,name,assigned_role,mmr[,roles]`. The
// optional `roles` column keeps drafted players' role lists; files without it
// still load, with no roles for drafted players.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::DataPaths;
use crate::draft::player::{
    format_role_priorities, parse_role_priorities, DataFormatError, PlayerRecord, RolePriority,
};
use crate::draft::team::AssignedRole;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid data in {path}: {source}")]
    Format {
        path: PathBuf,
        source: DataFormatError,
    },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Snapshot model
// ---------------------------------------------------------------------------

/// One drafted roster entry, flattened for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team_id: String,
    pub name: String,
    pub assigned_role: AssignedRole,
    pub rating: f64,
    pub role_priorities: Vec<RolePriority>,
}

/// Everything needed to rebuild players, pools and teams. History is not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub remaining: Vec<PlayerRecord>,
    pub assignments: Vec<TeamAssignment>,
}

/// Somewhere a snapshot can be written to and read back from.
pub trait SnapshotStore {
    fn save(&self, snapshot: &DraftSnapshot) -> Result<(), PersistenceError>;
    fn load(&self) -> Result<DraftSnapshot, PersistenceError>;
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct RemainingRow {
    name: String,
    mmr: f64,
    #[serde(default)]
    roles: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssignmentRow {
    team_id: String,
    name: String,
    assigned_role: String,
    mmr: f64,
    #[serde(default)]
    roles: String,
}

// ---------------------------------------------------------------------------
// Codec (reader/writer based so it can be exercised in memory)
// ---------------------------------------------------------------------------

/// Decode a pool file. The first bad row aborts the whole decode.
pub fn decode_remaining<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, DataFormatError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut seen = HashSet::new();
    let mut players = Vec::new();

    for (i, result) in reader.deserialize::<RemainingRow>().enumerate() {
        let row = i + 1;
        let raw = result.map_err(|source| DataFormatError::Csv { row, source })?;
        let roles = parse_role_priorities(&raw.roles).map_err(|e| e.at_row(row))?;
        let record = PlayerRecord::new(raw.name, raw.mmr, roles);
        record.check().map_err(|e| e.at_row(row))?;
        if !seen.insert(record.name.clone()) {
            return Err(DataFormatError::DuplicatePlayer { name: record.name }.at_row(row));
        }
        players.push(record);
    }

    Ok(players)
}

/// Decode a team-assignment file. The first bad row aborts the whole decode.
pub fn decode_assignments<R: Read>(rdr: R) -> Result<Vec<TeamAssignment>, DataFormatError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut assignments = Vec::new();

    for (i, result) in reader.deserialize::<AssignmentRow>().enumerate() {
        let row = i + 1;
        let raw = result.map_err(|source| DataFormatError::Csv { row, source })?;
        if raw.name.is_empty() {
            return Err(DataFormatError::EmptyName.at_row(row));
        }
        if !raw.mmr.is_finite() {
            return Err(DataFormatError::InvalidRating { player: raw.name }.at_row(row));
        }
        let role_priorities = parse_role_priorities(&raw.roles).map_err(|e| e.at_row(row))?;
        assignments.push(TeamAssignment {
            team_id: raw.team_id,
            name: raw.name,
            assigned_role: AssignedRole::parse(&raw.assigned_role),
            rating: raw.mmr,
            role_priorities,
        });
    }

    Ok(assignments)
}

pub fn encode_remaining<W: Write>(wtr: W, players: &[PlayerRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(wtr);
    writer.write_record(["name", "mmr", "roles"])?;
    for player in players {
        writer.serialize(RemainingRow {
            name: player.name.clone(),
            mmr: player.rating,
            roles: player.roles_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn encode_assignments<W: Write>(
    wtr: W,
    assignments: &[TeamAssignment],
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(wtr);
    // Header is written by hand so an empty draft still produces a valid file.
    writer.write_record(["team_id", "name", "assigned_role", "mmr", "roles"])?;
    for a in assignments {
        writer.serialize(AssignmentRow {
            team_id: a.team_id.clone(),
            name: a.name.clone(),
            assigned_role: a.assigned_role.to_string(),
            mmr: a.rating,
            roles: format_role_priorities(&a.role_priorities),
        })?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Read the initial player pool from a CSV file.
pub fn read_player_pool(path: &Path) -> Result<Vec<PlayerRecord>, PersistenceError> {
    let file = open(path)?;
    decode_remaining(BufReader::new(file)).map_err(|source| PersistenceError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// The legacy two-file CSV layout.
#[derive(Debug, Clone)]
pub struct CsvSnapshotStore {
    pub remaining_path: PathBuf,
    pub teams_path: PathBuf,
}

impl CsvSnapshotStore {
    pub fn new(remaining_path: impl Into<PathBuf>, teams_path: impl Into<PathBuf>) -> Self {
        CsvSnapshotStore {
            remaining_path: remaining_path.into(),
            teams_path: teams_path.into(),
        }
    }

    pub fn from_paths(paths: &DataPaths) -> Self {
        Self::new(&paths.remaining, &paths.teams)
    }
}

impl SnapshotStore for CsvSnapshotStore {
    /// Both files are written to `*.tmp` siblings first and only renamed into
    /// place once both encodes succeed. On failure the previous save is left
    /// as it was.
    fn save(&self, snapshot: &DraftSnapshot) -> Result<(), PersistenceError> {
        let remaining_tmp = tmp_path(&self.remaining_path);
        let teams_tmp = tmp_path(&self.teams_path);

        let written = write_file(&remaining_tmp, |w| encode_remaining(w, &snapshot.remaining))
            .and_then(|()| {
                write_file(&teams_tmp, |w| encode_assignments(w, &snapshot.assignments))
            });
        if let Err(e) = written {
            discard(&[remaining_tmp.as_path(), teams_tmp.as_path()]);
            return Err(e);
        }

        if let Err(e) = rename(&teams_tmp, &self.teams_path) {
            discard(&[remaining_tmp.as_path(), teams_tmp.as_path()]);
            return Err(e);
        }
        rename(&remaining_tmp, &self.remaining_path)?;

        info!(
            "Saved {} remaining players to {} and {} assignments to {}",
            snapshot.remaining.len(),
            self.remaining_path.display(),
            snapshot.assignments.len(),
            self.teams_path.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<DraftSnapshot, PersistenceError> {
        // Open both files before decoding either, so a missing file is
        // reported before any parsing work.
        let remaining_file = open(&self.remaining_path)?;
        let teams_file = open(&self.teams_path)?;

        let remaining = decode_remaining(BufReader::new(remaining_file)).map_err(|source| {
            PersistenceError::Format {
                path: self.remaining_path.clone(),
                source,
            }
        })?;
        let assignments = decode_assignments(BufReader::new(teams_file)).map_err(|source| {
            PersistenceError::Format {
                path: self.teams_path.clone(),
                source,
            }
        })?;

        info!(
            "Loaded {} remaining players and {} assignments",
            remaining.len(),
            assignments.len()
        );
        Ok(DraftSnapshot {
            remaining,
            assignments,
        })
    }
}

fn open(path: &Path) -> Result<File, PersistenceError> {
    File::open(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<File, PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    File::create(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(
    path: &Path,
    encode: impl FnOnce(BufWriter<File>) -> Result<(), csv::Error>,
) -> Result<(), PersistenceError> {
    let file = create(path)?;
    encode(BufWriter::new(file)).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn rename(from: &Path, to: &Path) -> Result<(), PersistenceError> {
    std::fs::rename(from, to).map_err(|source| PersistenceError::Io {
        path: to.to_path_buf(),
        source,
    })
}

/// `teams.csv` -> `teams.csv.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}

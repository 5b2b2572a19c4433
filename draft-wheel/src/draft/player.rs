// Pool members, their ranked roles, and the `role(priority)|...` grammar.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems found in player data. Any of these aborts the whole load.
#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("malformed role list `{input}`: {reason}")]
    MalformedRoles { input: String, reason: String },

    #[error("role `{role}` listed more than once")]
    DuplicateRole { role: String },

    #[error("player `{player}` lists unknown role `{role}`")]
    UnknownRole { player: String, role: String },

    #[error("player `{name}` appears more than once")]
    DuplicatePlayer { name: String },

    #[error("player `{player}` has a non-finite rating")]
    InvalidRating { player: String },

    #[error("player name must not be empty")]
    EmptyName,

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<DataFormatError>,
    },

    #[error("row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
}

impl DataFormatError {
    /// Attach a 1-based data row number.
    pub fn at_row(self, row: usize) -> Self {
        DataFormatError::Row {
            row,
            source: Box::new(self),
        }
    }
}

/// One entry of a player's ranked role list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RolePriority {
    pub role: String,
    /// 1 is the most preferred.
    pub priority: u32,
}

impl RolePriority {
    pub fn new(role: impl Into<String>, priority: u32) -> Self {
        RolePriority {
            role: role.into(),
            priority,
        }
    }
}

impl fmt::Display for RolePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.role, self.priority)
    }
}

/// A pool member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Unique key.
    pub name: String,
    /// Skill rating (MMR).
    pub rating: f64,
    pub role_priorities: Vec<RolePriority>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, rating: f64, role_priorities: Vec<RolePriority>) -> Self {
        PlayerRecord {
            name: name.into(),
            rating,
            role_priorities,
        }
    }

    /// Priority the player gave `role`, if they listed it at all.
    pub fn priority_for(&self, role: &str) -> Option<u32> {
        self.role_priorities
            .iter()
            .find(|rp| rp.role == role)
            .map(|rp| rp.priority)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.role_priorities.iter().map(|rp| rp.role.as_str())
    }

    /// The role list in `role(priority)|...` form.
    pub fn roles_string(&self) -> String {
        format_role_priorities(&self.role_priorities)
    }

    /// Reject records that could not have come from a well-formed pool file.
    pub fn check(&self) -> Result<(), DataFormatError> {
        if self.name.trim().is_empty() {
            return Err(DataFormatError::EmptyName);
        }
        if !self.rating.is_finite() {
            return Err(DataFormatError::InvalidRating {
                player: self.name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for rp in &self.role_priorities {
            if !seen.insert(rp.role.as_str()) {
                return Err(DataFormatError::DuplicateRole {
                    role: rp.role.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Parse `carry(1)|mid(2)|offlane` into ranked roles.
///
/// A bare role name has priority 1. An empty string yields no roles.
/// Anything else that does not match the grammar is an error; nothing is
/// silently skipped.
pub fn parse_role_priorities(input: &str) -> Result<Vec<RolePriority>, DataFormatError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let malformed = |reason: &str| DataFormatError::MalformedRoles {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut result: Vec<RolePriority> = Vec::new();
    for part in trimmed.split('|') {
        let part = part.trim();
        if part.is_empty() {
            return Err(malformed("empty role entry"));
        }

        let entry = match part.find('(') {
            Some(open) => {
                let Some(inner) = part[open + 1..].strip_suffix(')') else {
                    return Err(malformed("priority must be closed with `)` at the end of the entry"));
                };
                let role = part[..open].trim();
                if role.is_empty() {
                    return Err(malformed("role name missing before `(`"));
                }
                let priority: u32 = inner
                    .trim()
                    .parse()
                    .map_err(|_| malformed("priority must be a positive integer"))?;
                if priority == 0 {
                    return Err(malformed("priority must be a positive integer"));
                }
                RolePriority::new(role, priority)
            }
            None if part.contains(')') => return Err(malformed("unmatched `)`")),
            None => RolePriority::new(part, 1),
        };

        if entry.role.contains(['(', ')']) {
            return Err(malformed("nested parentheses"));
        }
        if result.iter().any(|rp| rp.role == entry.role) {
            return Err(DataFormatError::DuplicateRole { role: entry.role });
        }
        result.push(entry);
    }

    Ok(result)
}

/// Inverse of [`parse_role_priorities`]: `[("carry",1),("mid",2)]` -> `carry(1)|mid(2)`.
pub fn format_role_priorities(roles: &[RolePriority]) -> String {
    roles
        .iter()
        .map(RolePriority::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Every known player, in load order.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    records: Vec<PlayerRecord>,
    index: HashMap<String, usize>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting invalid or duplicate records. Errors carry
    /// the 1-based position of the offending record.
    pub fn from_records(records: Vec<PlayerRecord>) -> Result<Self, DataFormatError> {
        let mut registry = PlayerRegistry::new();
        for (i, record) in records.into_iter().enumerate() {
            registry.insert(record).map_err(|e| e.at_row(i + 1))?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, record: PlayerRecord) -> Result<(), DataFormatError> {
        record.check()?;
        if self.index.contains_key(&record.name) {
            return Err(DataFormatError::DuplicatePlayer { name: record.name });
        }
        self.index.insert(record.name.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn rating(&self, name: &str) -> Option<f64> {
        self.get(name).map(|p| p.rating)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

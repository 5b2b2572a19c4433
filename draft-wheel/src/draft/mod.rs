// Draft domain: players, role pools, team rosters and the draft state.

pub mod player;
pub mod pool;
pub mod state;
pub mod team;

pub use player::{DataFormatError, PlayerRecord, RolePriority};
pub use state::{DraftError, DraftEvent, DraftState};
pub use team::{AssignedRole, Team};

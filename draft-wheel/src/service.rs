// Single-writer actor around one DraftState.
//
// A spawned task owns the state and applies commands one at a time from an
// mpsc channel, so concurrent callers can never interleave a compute and a
// pick against different pool contents. Every command carries a oneshot
// reply.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::draft::state::{DraftError, DraftState};
use crate::lottery::{Distribution, Segment};
use crate::persistence::DraftSnapshot;

/// Queue depth between handles and the actor.
const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("draft service has shut down")]
    Closed,

    #[error(transparent)]
    Draft(#[from] DraftError),
}

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub enum DraftCommand {
    Compute {
        team_id: String,
        role: String,
        reply: Reply<Result<Distribution, DraftError>>,
    },
    Pick {
        team_id: String,
        requested_role: String,
        candidate_role: String,
        position: f64,
        segments: Vec<Segment>,
        reply: Reply<Result<Option<String>, DraftError>>,
    },
    Spin {
        team_id: String,
        requested_role: String,
        candidate_role: String,
        position: f64,
        reply: Reply<Result<Option<String>, DraftError>>,
    },
    Undo {
        reply: Reply<Option<String>>,
    },
    AddCaptain {
        team_id: String,
        name: String,
        rating: f64,
        reply: Reply<Result<(), DraftError>>,
    },
    UnfilledRoles {
        team_id: String,
        reply: Reply<Result<Vec<String>, DraftError>>,
    },
    IsRoleEmpty {
        role: String,
        reply: Reply<bool>,
    },
    Snapshot {
        reply: Reply<DraftSnapshot>,
    },
    Restore {
        snapshot: DraftSnapshot,
        reply: Reply<Result<(), DraftError>>,
    },
}

/// Cloneable front end to the actor. The task ends once every handle is dropped.
#[derive(Debug, Clone)]
pub struct DraftHandle {
    tx: mpsc::Sender<DraftCommand>,
}

impl DraftHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> DraftCommand,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    pub async fn compute(&self, team_id: &str, role: &str) -> Result<Distribution, ServiceError> {
        let (team_id, role) = (team_id.to_string(), role.to_string());
        Ok(self
            .request(|reply| DraftCommand::Compute { team_id, role, reply })
            .await??)
    }

    pub async fn pick(
        &self,
        team_id: &str,
        requested_role: &str,
        candidate_role: &str,
        position: f64,
        segments: Vec<Segment>,
    ) -> Result<Option<String>, ServiceError> {
        let (team_id, requested_role, candidate_role) = (
            team_id.to_string(),
            requested_role.to_string(),
            candidate_role.to_string(),
        );
        Ok(self
            .request(|reply| DraftCommand::Pick {
                team_id,
                requested_role,
                candidate_role,
                position,
                segments,
                reply,
            })
            .await??)
    }

    pub async fn spin(
        &self,
        team_id: &str,
        requested_role: &str,
        candidate_role: &str,
        position: f64,
    ) -> Result<Option<String>, ServiceError> {
        let (team_id, requested_role, candidate_role) = (
            team_id.to_string(),
            requested_role.to_string(),
            candidate_role.to_string(),
        );
        Ok(self
            .request(|reply| DraftCommand::Spin {
                team_id,
                requested_role,
                candidate_role,
                position,
                reply,
            })
            .await??)
    }

    pub async fn undo(&self) -> Result<Option<String>, ServiceError> {
        self.request(|reply| DraftCommand::Undo { reply }).await
    }

    pub async fn add_captain(
        &self,
        team_id: &str,
        name: &str,
        rating: f64,
    ) -> Result<(), ServiceError> {
        let (team_id, name) = (team_id.to_string(), name.to_string());
        Ok(self
            .request(|reply| DraftCommand::AddCaptain {
                team_id,
                name,
                rating,
                reply,
            })
            .await??)
    }

    pub async fn unfilled_roles(&self, team_id: &str) -> Result<Vec<String>, ServiceError> {
        let team_id = team_id.to_string();
        Ok(self
            .request(|reply| DraftCommand::UnfilledRoles { team_id, reply })
            .await??)
    }

    pub async fn is_role_empty(&self, role: &str) -> Result<bool, ServiceError> {
        let role = role.to_string();
        self.request(|reply| DraftCommand::IsRoleEmpty { role, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<DraftSnapshot, ServiceError> {
        self.request(|reply| DraftCommand::Snapshot { reply }).await
    }

    pub async fn restore(&self, snapshot: DraftSnapshot) -> Result<(), ServiceError> {
        Ok(self
            .request(|reply| DraftCommand::Restore { snapshot, reply })
            .await??)
    }
}

/// Move `state` into a new actor task.
///
/// The join handle yields the final state once every [`DraftHandle`] is dropped.
pub fn spawn(state: DraftState) -> (DraftHandle, JoinHandle<DraftState>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(rx, state));
    (DraftHandle { tx }, task)
}

async fn run(mut rx: mpsc::Receiver<DraftCommand>, mut state: DraftState) -> DraftState {
    info!("Draft service started");
    while let Some(cmd) = rx.recv().await {
        handle_command(&mut state, cmd);
    }
    info!("All draft handles dropped, service exiting");
    state
}

/// Apply one command. A caller that has gone away just loses its reply.
fn handle_command(state: &mut DraftState, cmd: DraftCommand) {
    match cmd {
        DraftCommand::Compute {
            team_id,
            role,
            reply,
        } => {
            let _ = reply.send(state.compute(&team_id, &role));
        }
        DraftCommand::Pick {
            team_id,
            requested_role,
            candidate_role,
            position,
            segments,
            reply,
        } => {
            let result = state.pick(
                &team_id,
                &requested_role,
                &candidate_role,
                position,
                &segments,
            );
            let _ = reply.send(result);
        }
        DraftCommand::Spin {
            team_id,
            requested_role,
            candidate_role,
            position,
            reply,
        } => {
            let result = state.spin(&team_id, &requested_role, &candidate_role, position);
            let _ = reply.send(result);
        }
        DraftCommand::Undo { reply } => {
            let _ = reply.send(state.undo());
        }
        DraftCommand::AddCaptain {
            team_id,
            name,
            rating,
            reply,
        } => {
            let _ = reply.send(state.add_captain(&team_id, &name, rating));
        }
        DraftCommand::UnfilledRoles { team_id, reply } => {
            let _ = reply.send(state.unfilled_roles(&team_id));
        }
        DraftCommand::IsRoleEmpty { role, reply } => {
            let _ = reply.send(state.is_role_empty(&role));
        }
        DraftCommand::Snapshot { reply } => {
            debug!("Snapshot requested");
            let _ = reply.send(state.snapshot());
        }
        DraftCommand::Restore { snapshot, reply } => {
            let _ = reply.send(state.restore(snapshot));
        }
    }
}

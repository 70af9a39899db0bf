//! Optimistic status moves.
//!
//! A move is applied to the canonical collection immediately, the
//! authoritative update is sent, and the outcome either commits the server's
//! record or rolls the view back by refetching. Rollback never tries to
//! restore the pre-move record in place: after an intervening re-sort the old
//! position cannot be reconstructed, so the page is refetched instead.

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Issue, IssueStatus, UpdateIssueRequest};
use crate::view::collection::{Applied, ReconciliationEngine};

/// Lifecycle of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

/// Handle for an in-flight mutation, returned by [`OptimisticCoordinator::begin`].
#[derive(Debug, Clone, PartialEq)]
pub struct MutationTicket {
    pub mutation_id: Uuid,
    pub issue_id: String,
    pub requested: IssueStatus,
    /// Body to send to the update endpoint
    pub request: UpdateIssueRequest,
}

/// What the caller must do after resolving a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The server record was applied; re-derive the view.
    Committed,
    /// The local change is void; refetch the current page and show `message`.
    Refetch { message: String },
    /// The ticket was unknown or already resolved.
    Stale,
}

#[derive(Debug, Clone)]
struct InFlight {
    issue_id: String,
    state: MutationState,
}

/// Tracks optimistic mutations for one view.
#[derive(Debug, Default)]
pub struct OptimisticCoordinator {
    in_flight: HashMap<Uuid, InFlight>,
}

/// Message shown when a failed update carries no server message.
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update issue status";

impl OptimisticCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status change locally and open a pending mutation.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue is not in the collection.
    pub fn begin(
        &mut self,
        engine: &mut ReconciliationEngine<Issue>,
        issue_id: &str,
        status: IssueStatus,
    ) -> Result<MutationTicket> {
        let mut local = engine
            .get(issue_id)
            .cloned()
            .ok_or_else(|| Error::IssueNotFound {
                id: issue_id.to_string(),
            })?;

        local.status = status;
        engine.upsert(local);

        let mutation_id = Uuid::new_v4();
        self.in_flight.insert(
            mutation_id,
            InFlight {
                issue_id: issue_id.to_string(),
                state: MutationState::Pending,
            },
        );
        debug!(%mutation_id, issue_id, %status, "Optimistic move applied");

        Ok(MutationTicket {
            mutation_id,
            issue_id: issue_id.to_string(),
            requested: status,
            request: UpdateIssueRequest::status(status),
        })
    }

    /// Resolve a mutation with the server's answer.
    ///
    /// On success the returned record goes through the engine's ordinary
    /// upsert path, so server-side effects (e.g. `updatedAt`) land and the
    /// server's status wins over the optimistic guess.
    pub fn resolve(
        &mut self,
        engine: &mut ReconciliationEngine<Issue>,
        ticket: &MutationTicket,
        outcome: Result<Issue>,
    ) -> Resolution {
        let Some(entry) = self.in_flight.get_mut(&ticket.mutation_id) else {
            return Resolution::Stale;
        };
        if entry.state != MutationState::Pending {
            return Resolution::Stale;
        }

        match outcome {
            Ok(server) => {
                if server.id != entry.issue_id {
                    warn!(
                        expected = %entry.issue_id,
                        got = %server.id,
                        "Update response is for a different issue"
                    );
                }
                let applied = engine.upsert(server);
                debug!(mutation_id = %ticket.mutation_id, inserted = matches!(applied, Applied::Inserted), "Mutation committed");
                entry.state = MutationState::Committed;
                Resolution::Committed
            }
            Err(err) => {
                warn!(mutation_id = %ticket.mutation_id, issue_id = %entry.issue_id, error = %err, "Mutation failed, rolling back");
                entry.state = MutationState::RolledBack;
                Resolution::Refetch {
                    message: err.user_message(UPDATE_FAILED_MESSAGE),
                }
            }
        }
    }

    /// Current state of a mutation, if known.
    #[must_use]
    pub fn state(&self, mutation_id: &Uuid) -> Option<MutationState> {
        self.in_flight.get(mutation_id).map(|m| m.state)
    }

    /// Number of mutations still awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight
            .values()
            .filter(|m| m.state == MutationState::Pending)
            .count()
    }

    /// Forget resolved mutations.
    pub fn prune(&mut self) {
        self.in_flight.retain(|_, m| m.state == MutationState::Pending);
    }

    /// Forget everything (view teardown).
    pub fn clear(&mut self) {
        self.in_flight.clear();
    }
}

//! Client-side views over server-owned collections.
//!
//! Each view owns a canonical collection (via [`ReconciliationEngine`]), the
//! registry its streams live in, and the derived display state. All mutation
//! happens through `&mut self`, so a view is driven from one logical thread:
//! page fetches, stream events and optimistic edits never interleave.

pub mod collection;
pub mod issues;
pub mod materialize;
pub mod optimistic;
pub mod pagination;
pub mod projects;

pub use collection::{Applied, Change, ReconciliationEngine};
pub use issues::IssueView;
pub use materialize::{
    BoardPartitions, FilterCriteria, Materialized, SortCriteria, SortDirection, SortField,
    materialize, materialize_projects,
};
pub use optimistic::{MutationState, MutationTicket, OptimisticCoordinator, Resolution};
pub use pagination::{DEFAULT_PAGE_SIZE, PageState, PaginationController};
pub use projects::ProjectView;

use tracing::info;

use crate::error::Result;
use crate::model::{Issue, Project};
use crate::stream::{ConnectionKey, EventChannel, StreamEvent};

/// What a view should do with the next stream item.
#[derive(Debug)]
pub(crate) enum Delivery {
    /// First handshake on this subscription; nothing to do.
    Handshake,
    /// A handshake after a reconnect; events may have been missed.
    Resync,
    Issue(Change<Issue>),
    Project(Change<Project>),
}

/// A view's live channel plus its handshake count.
#[derive(Debug)]
pub(crate) struct Subscription {
    channel: EventChannel,
    handshakes: u32,
}

impl Subscription {
    pub(crate) const fn new(channel: EventChannel) -> Self {
        Self {
            channel,
            handshakes: 0,
        }
    }

    pub(crate) const fn key(&self) -> &ConnectionKey {
        self.channel.key()
    }

    /// Next item, `None` once the channel is closed.
    pub(crate) async fn next(&mut self) -> Option<Result<Delivery>> {
        let item = self.channel.recv().await?;
        Some(item.map(|event| match event {
            StreamEvent::Connected(message) => {
                self.handshakes += 1;
                if self.handshakes > 1 {
                    info!(key = %self.channel.key(), %message, "Stream re-established, resynchronizing");
                    Delivery::Resync
                } else {
                    Delivery::Handshake
                }
            }
            StreamEvent::Issue(change) => Delivery::Issue(change),
            StreamEvent::Project(change) => Delivery::Project(change),
        }))
    }
}

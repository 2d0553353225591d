//! Interactive sessions: owner binding, staged progress and step deadlines.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use threadcard_core::{FieldValue, UserId};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::error::SessionError;
use crate::gateway::{ChatGateway, Interaction, MessageHandle};

/// A stage of one interactive flow.
pub trait FlowStage: Copy + Eq + fmt::Debug + Send + Sync {
    /// Whether the flow may move from `self` to `next`.
    fn allows(self, next: Self) -> bool;

    /// Stage a flow lands in when a step deadline passes.
    fn expired() -> Self;

    fn is_terminal(self) -> bool;
}

/// One user's conversation with the engine, bound to the invoking user.
///
/// Only the owner's interactions advance it; anyone else is told so and
/// ignored. Each step is armed with its own deadline.
#[derive(Debug)]
pub struct Session<S: FlowStage> {
    id: Uuid,
    owner: UserId,
    stage: S,
    collected: BTreeMap<String, FieldValue>,
    deadline: Option<Instant>,
}

impl<S: FlowStage> Session<S> {
    pub fn new(owner: UserId, start: S) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, owner = %owner, stage = ?start, "Session opened");
        Self {
            id,
            owner,
            stage: start,
            collected: BTreeMap::new(),
            deadline: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn stage(&self) -> S {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to `next`, rejecting transitions the flow does not define.
    pub fn advance(&mut self, next: S) -> Result<(), SessionError> {
        if !self.stage.allows(next) {
            return Err(SessionError::InvalidTransition {
                from: format!("{:?}", self.stage),
                to: format!("{:?}", next),
            });
        }
        debug!(session = %self.id, from = ?self.stage, to = ?next, "Session advanced");
        self.stage = next;
        Ok(())
    }

    /// End the flow after a missed deadline, whatever stage it was waiting in.
    pub fn expire(&mut self) {
        debug!(session = %self.id, stage = ?self.stage, "Session expired");
        self.stage = S::expired();
        self.deadline = None;
    }

    pub fn authorize(&self, user: &UserId) -> Result<(), SessionError> {
        if user == &self.owner {
            Ok(())
        } else {
            Err(SessionError::NotOwner(user.clone()))
        }
    }

    pub fn collect(&mut self, name: impl Into<String>, value: FieldValue) {
        self.collected.insert(name.into(), value);
    }

    pub fn take(&mut self, name: &str) -> Option<FieldValue> {
        self.collected.remove(name)
    }

    pub fn collected(&self) -> &BTreeMap<String, FieldValue> {
        &self.collected
    }

    /// Start the clock for the next step.
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Time left in the current step; zero when unarmed or past the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Wait for the owner's next interaction on `handle`.
    ///
    /// Interactions by other users get a private rejection notice and do not
    /// reset the deadline.
    pub async fn wait_for_owner(
        &self,
        gateway: &dyn ChatGateway,
        handle: &MessageHandle,
    ) -> Result<Interaction, SessionError> {
        loop {
            let remaining = self.remaining();
            if remaining.is_zero() {
                return Err(SessionError::Timeout);
            }
            let Some(interaction) = gateway.next_interaction(handle, remaining).await? else {
                return Err(SessionError::Timeout);
            };
            match self.authorize(&interaction.user) {
                Ok(()) => return Ok(interaction),
                Err(err) => {
                    debug!(session = %self.id, user = %interaction.user, "Rejected foreign interaction");
                    gateway
                        .notify_user(handle, &interaction.user, &err.user_message())
                        .await?;
                }
            }
        }
    }
}

//! Interactive sessions for threadcard.
//!
//! Each chat command runs as a session owned by the invoking user: a small
//! state machine that prompts through the [`ChatGateway`], waits for the
//! owner's answer under a deadline, and reads or writes records through the
//! [`RecordStore`](threadcard_store::RecordStore).

pub mod browse;
pub mod commands;
pub mod creation;
pub mod editing;
pub mod engine;
pub mod error;
pub mod form;
pub mod gateway;
pub mod management;
pub mod search;
pub mod session;
pub mod setup;
pub mod stages;
pub mod summarize;

#[cfg(test)]
mod testing;

pub use browse::{BrowseActions, CardAction, ResultPager};
pub use commands::Command;
pub use engine::{FlowOutcome, SessionEngine};
pub use error::{ChatError, SessionError};
pub use form::{compose_form, FormError, FormPlan};
pub use gateway::{
    Attachment, ChatGateway, ChatUser, CommandContext, HistoryMessage, Interaction,
    InteractionAction, MessageHandle, OutgoingMessage, ThreadInfo,
};
pub use session::{FlowStage, Session};
pub use summarize::{GeminiSummarizer, Summarizer};

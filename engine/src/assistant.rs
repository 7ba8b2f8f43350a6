//! Session layer
//!
//! Owns everything per-session: history persistence, the compacted view
//! handed to the supervisor as seed context, and budget settlement after
//! each exchange. The supervisor below this layer is stateless across
//! queries; the assistant is what makes a conversation out of it.

use crate::db::history::ChatHistoryRepository;
use crate::memory::{CompactionOutcome, MemoryBudgetController};
use crate::supervisor::Supervisor;
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

pub struct Assistant {
    supervisor: Arc<Supervisor>,
    history: ChatHistoryRepository,
    memory: MemoryBudgetController,
}

impl Assistant {
    pub fn new(
        supervisor: Arc<Supervisor>,
        history: ChatHistoryRepository,
        memory: MemoryBudgetController,
    ) -> Self {
        Self {
            supervisor,
            history,
            memory,
        }
    }

    /// Handle one user message in a session and return the reply.
    ///
    /// Both sides of the exchange are persisted even when resolution fails;
    /// a failed query still happened and later turns may refer to it.
    pub async fn handle_query(&self, session_id: &str, user_text: &str) -> Result<String> {
        self.history.ensure_session(session_id).await?;
        let seed = self.seed_context(session_id).await?;
        self.history.append_turn(session_id, "user", user_text).await?;

        let reply = match self.supervisor.resolve(user_text, &seed).await {
            Ok((answer, context)) => {
                info!(
                    session = session_id,
                    tasks = context.entries().len(),
                    "query resolved"
                );
                answer.text
            }
            Err(resolve_error) => {
                error!(session = session_id, %resolve_error, "query resolution failed");
                "I'm sorry, I ran into a problem and couldn't complete that request. \
                 Please try again."
                    .to_string()
            }
        };

        self.history
            .append_turn(session_id, "assistant", &reply)
            .await?;

        match self.memory.settle(session_id).await? {
            CompactionOutcome::Failed { reason } => {
                // over budget but intact; the next exchange retries
                info!(session = session_id, reason, "compaction deferred");
            }
            outcome => {
                info!(session = session_id, ?outcome, "budget settled");
            }
        }

        Ok(reply)
    }

    /// Render the compacted history view as seed context for the supervisor
    async fn seed_context(&self, session_id: &str) -> Result<String> {
        let view = self.history.read_history(session_id).await?;

        let mut seed = String::new();
        if let Some(summary) = &view.summary {
            seed.push_str(&format!("Summary of the conversation so far:\n{summary}\n"));
        }
        for turn in &view.turns {
            seed.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        Ok(seed)
    }
}

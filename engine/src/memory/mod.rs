//! Memory-budget controller
//!
//! Keeps each session's prompt-visible history under a fixed character
//! budget. After every exchange the controller measures the raw text
//! recorded since the active checkpoint; when the budget is exceeded it
//! summarizes the older turns through the model collaborator and writes a
//! new checkpoint, keeping a small tail of the most recent turns raw so
//! immediate context survives verbatim.
//!
//! Compaction failure is deliberately soft: the raw history is still in the
//! database, so a summarization error leaves the session over budget but
//! fully intact, and the next exchange simply retries.

use crate::db::history::ChatHistoryRepository;
use crate::llm::{Message, ModelProvider};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Whether a session currently fits its budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    WithinBudget,
    OverBudget,
}

/// What `settle` did for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// The session fits its budget, nothing to do
    NotNeeded,

    /// Another settle call holds this session's compaction gate; this one
    /// yielded rather than double-summarizing
    Coalesced,

    /// A new checkpoint was written
    Compacted {
        /// Turns folded into the new summary
        summarized_turns: usize,
        /// Raw turns left after the checkpoint
        tail_turns: usize,
    },

    /// Summarization failed; raw history is untouched and the next settle
    /// will retry
    Failed { reason: String },
}

/// Per-session history compactor
pub struct MemoryBudgetController {
    history: ChatHistoryRepository,
    model: Arc<dyn ModelProvider>,
    budget_chars: usize,
    recent_tail_turns: usize,
    // one gate per session so concurrent settles coalesce instead of racing
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryBudgetController {
    pub fn new(
        history: ChatHistoryRepository,
        model: Arc<dyn ModelProvider>,
        budget_chars: usize,
        recent_tail_turns: usize,
    ) -> Self {
        Self {
            history,
            model,
            budget_chars,
            recent_tail_turns,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the session's post-checkpoint raw text exceeds the budget
    pub async fn state(&self, session_id: &str) -> Result<BudgetState> {
        let length = self.history.text_length_since_checkpoint(session_id).await?;
        if length as usize > self.budget_chars {
            Ok(BudgetState::OverBudget)
        } else {
            Ok(BudgetState::WithinBudget)
        }
    }

    /// Measure the session and compact it if it exceeds the budget.
    ///
    /// Called after every exchange. Database errors propagate; model errors
    /// do not, they resolve to [`CompactionOutcome::Failed`] because an
    /// over-budget session is still a working session.
    pub async fn settle(&self, session_id: &str) -> Result<CompactionOutcome> {
        if self.state(session_id).await? == BudgetState::WithinBudget {
            return Ok(CompactionOutcome::NotNeeded);
        }

        let gate = self.gate_for(session_id).await;
        let held = match Arc::clone(&gate).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(session = session_id, "compaction already in flight");
                self.release_gate(session_id, gate).await;
                return Ok(CompactionOutcome::Coalesced);
            }
        };

        // Re-check under the gate: the settle we coalesced behind may have
        // already brought the session back under budget.
        let outcome = if self.state(session_id).await? == BudgetState::WithinBudget {
            Ok(CompactionOutcome::NotNeeded)
        } else {
            self.compact(session_id).await
        };

        drop(held);
        self.release_gate(session_id, gate).await;
        outcome
    }

    async fn gate_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        gates
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the session's gate entry once no other settle holds a handle to
    /// it, so the map tracks in-flight sessions rather than every session id
    /// the process has ever seen.
    async fn release_gate(&self, session_id: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self.gates.lock().await;
        // two handles left means the map entry plus ours; holding the map
        // lock here keeps gate_for from handing out a third concurrently
        if Arc::strong_count(&gate) == 2 {
            gates.remove(session_id);
        }
    }

    async fn compact(&self, session_id: &str) -> Result<CompactionOutcome> {
        let checkpoint = self.history.latest_checkpoint(session_id).await?;
        let after_id = checkpoint.as_ref().map(|c| c.up_to_message_id).unwrap_or(0);
        let turns = self.history.turns_after(session_id, after_id).await?;

        if turns.is_empty() {
            return Ok(CompactionOutcome::NotNeeded);
        }

        // Keep the newest turns raw; if the tail alone blows the budget the
        // checkpoint has to cover everything.
        let tail_len: usize = turns
            .iter()
            .rev()
            .take(self.recent_tail_turns)
            .map(|t| t.content.len())
            .sum();
        let cut = if turns.len() <= self.recent_tail_turns || tail_len >= self.budget_chars {
            turns.len()
        } else {
            turns.len() - self.recent_tail_turns
        };

        let mut conversation = String::new();
        for turn in &turns[..cut] {
            conversation.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }

        let prior = checkpoint.as_ref().map(|c| c.summary.as_str()).unwrap_or("");
        let user_prompt = if prior.is_empty() {
            format!("Conversation to summarize:\n{conversation}")
        } else {
            format!(
                "Earlier summary of this conversation:\n{prior}\n\n\
                 New turns to fold in:\n{conversation}"
            )
        };

        let messages = [
            Message::system(
                "Summarize the conversation below into a compact paragraph. \
                 Preserve every concrete fact the user stated about themselves \
                 (names, places, preferences, numbers) and any decisions made. \
                 Output only the summary.",
            ),
            Message::user(user_prompt),
        ];

        let summary = match self.model.generate(&messages).await {
            Ok(summary) => summary,
            Err(error) => {
                warn!(session = session_id, %error, "summarization failed, keeping raw history");
                return Ok(CompactionOutcome::Failed {
                    reason: error.to_string(),
                });
            }
        };

        let up_to = turns[cut - 1].id;
        self.history
            .write_checkpoint(session_id, &summary, up_to)
            .await?;

        info!(
            session = session_id,
            summarized = cut,
            tail = turns.len() - cut,
            "history compacted"
        );

        Ok(CompactionOutcome::Compacted {
            summarized_turns: cut,
            tail_turns: turns.len() - cut,
        })
    }
}

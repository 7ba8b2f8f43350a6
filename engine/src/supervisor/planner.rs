//! Task planner
//!
//! Turns a raw user query into an ordered sequence of atomic tasks via the
//! model collaborator's JSON-constrained mode. The planner validates and, if
//! needed, reorders the emitted list so dependencies always precede
//! dependents; it never resolves dependencies itself, that is the router's
//! and loop's job. A trivial query yields a single task equal to the query.

use crate::llm::{self, Message, ModelError, ModelProvider};
use crate::supervisor::error::PlanningError;
use serde::Deserialize;
use std::sync::Arc;

/// One atomic task emitted by the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Position in the plan, also the task's id for dependency references
    pub index: usize,

    /// What to do, in the planner's words
    pub description: String,

    /// Indices of earlier tasks whose results this task's input should
    /// reference
    pub depends_on: Vec<usize>,
}

/// An ordered, validated plan
#[derive(Debug, Clone)]
pub struct Plan {
    /// The query the plan was derived from
    pub query: String,

    /// Tasks in execution order; never empty
    pub tasks: Vec<Task>,
}

/// Intermediate deserialization types for the model's JSON output
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    description: String,
    #[serde(default)]
    depends_on: Vec<usize>,
}

pub struct TaskPlanner {
    model: Arc<dyn ModelProvider>,
}

impl TaskPlanner {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self { model }
    }

    /// Decompose a query into an ordered task list.
    ///
    /// A malformed model response is retried once inside `generate_json`;
    /// if it still cannot be parsed the planner degrades to a single task
    /// equal to the raw query rather than dropping the user's intent.
    /// An explicit empty task list and dependency cycles are hard
    /// `PlanningError`s.
    pub async fn plan(&self, query: &str) -> Result<Plan, PlanningError> {
        let messages = [
            Message::system(
                "You are a task planner for an assistant. Break the user's request \
                 into the smallest ordered list of atomic tasks.\n\
                 Output ONLY a JSON object of the form:\n\
                 {\"tasks\": [{\"description\": \"...\", \"depends_on\": [0]}]}\n\
                 - \"depends_on\" lists zero-based indices of earlier tasks whose \
                 results this task needs; use [] when independent.\n\
                 - A simple request is a single task whose description is the \
                 request itself.\n\
                 No markdown, no explanation.",
            ),
            Message::user(query),
        ];

        let raw = match llm::generate_json::<RawPlan>(self.model.as_ref(), &messages).await {
            Ok(raw) => raw,
            Err(ModelError::ResponseFormat(detail)) => {
                tracing::warn!(detail, "plan output unusable, degrading to single task");
                return Ok(Plan {
                    query: query.to_string(),
                    tasks: vec![Task {
                        index: 0,
                        description: query.to_string(),
                        depends_on: Vec::new(),
                    }],
                });
            }
            Err(other) => return Err(PlanningError::Model(other)),
        };

        if raw.tasks.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }

        let tasks: Vec<(String, Vec<usize>)> = raw
            .tasks
            .into_iter()
            .map(|t| (t.description, t.depends_on))
            .collect();

        let ordered = order_tasks(tasks)?;

        tracing::debug!(task_count = ordered.len(), "plan ready");
        Ok(Plan {
            query: query.to_string(),
            tasks: ordered,
        })
    }
}

/// Order `(description, depends_on)` pairs topologically.
///
/// The emitted order is kept wherever it is already valid (stable Kahn's
/// algorithm: among ready tasks the original position wins). Dependency
/// indices are remapped to the new positions. Cycles and out-of-range
/// dependencies are `PlanningError`s.
pub fn order_tasks(tasks: Vec<(String, Vec<usize>)>) -> Result<Vec<Task>, PlanningError> {
    let count = tasks.len();

    for (index, (_, deps)) in tasks.iter().enumerate() {
        for &dep in deps {
            if dep >= count {
                return Err(PlanningError::UnknownDependency {
                    task: index,
                    dependency: dep,
                });
            }
            if dep == index {
                return Err(PlanningError::CyclicDependency(index));
            }
        }
    }

    // Stable Kahn's algorithm over the original indices.
    let mut remaining: Vec<usize> = (0..count).collect();
    let mut placed = vec![usize::MAX; count]; // original index -> new position
    let mut order: Vec<usize> = Vec::with_capacity(count);

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|&candidate| {
            tasks[candidate]
                .1
                .iter()
                .all(|&dep| placed[dep] != usize::MAX)
        });

        match ready {
            Some(position) => {
                let original = remaining.remove(position);
                placed[original] = order.len();
                order.push(original);
            }
            None => {
                // Every remaining task waits on another remaining task.
                return Err(PlanningError::CyclicDependency(remaining[0]));
            }
        }
    }

    Ok(order
        .into_iter()
        .enumerate()
        .map(|(new_index, original)| Task {
            index: new_index,
            description: tasks[original].0.clone(),
            depends_on: tasks[original].1.iter().map(|&d| placed[d]).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(descriptions: &[(&str, &[usize])]) -> Vec<(String, Vec<usize>)> {
        descriptions
            .iter()
            .map(|(d, deps)| (d.to_string(), deps.to_vec()))
            .collect()
    }

    #[test]
    fn valid_order_is_preserved() {
        let ordered = order_tasks(plain(&[("a", &[]), ("b", &[0]), ("c", &[1])])).unwrap();
        let descriptions: Vec<&str> = ordered.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "b", "c"]);
        assert_eq!(ordered[1].depends_on, vec![0]);
        assert_eq!(ordered[2].depends_on, vec![1]);
    }

    #[test]
    fn forward_dependency_is_reordered() {
        // task 0 depends on task 1: the planner must move task 1 first
        let ordered = order_tasks(plain(&[("needs data", &[1]), ("fetch data", &[])])).unwrap();
        assert_eq!(ordered[0].description, "fetch data");
        assert_eq!(ordered[1].description, "needs data");
        assert_eq!(ordered[1].depends_on, vec![0]);
    }

    #[test]
    fn cycle_is_rejected() {
        let result = order_tasks(plain(&[("a", &[1]), ("b", &[0])]));
        assert!(matches!(result, Err(PlanningError::CyclicDependency(_))));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let result = order_tasks(plain(&[("a", &[0])]));
        assert!(matches!(result, Err(PlanningError::CyclicDependency(0))));
    }

    #[test]
    fn out_of_range_dependency_is_rejected() {
        let result = order_tasks(plain(&[("a", &[7])]));
        assert!(matches!(
            result,
            Err(PlanningError::UnknownDependency {
                task: 0,
                dependency: 7
            })
        ));
    }
}

//! End-to-end tests of the supervising coordinator through the session
//! layer: plan, delegate, execute, synthesize, persist.

mod common;

use common::{OfflineModel, ScriptedModel};
use maestro_engine::assistant::Assistant;
use maestro_engine::db::Database;
use maestro_engine::executors::{ConversationalExecutor, DocumentExecutor, ToolExecutor};
use maestro_engine::llm::ModelProvider;
use maestro_engine::memory::MemoryBudgetController;
use maestro_engine::supervisor::{CapabilityRegistry, Supervisor};
use std::sync::Arc;
use tempfile::TempDir;

fn build_assistant(db: &Database, model: Arc<dyn ModelProvider>) -> Assistant {
    let registry = Arc::new(CapabilityRegistry::new());
    registry
        .register(Arc::new(ConversationalExecutor::new(Arc::clone(&model))))
        .unwrap();
    registry
        .register(Arc::new(DocumentExecutor::new(
            Arc::clone(&model),
            db.documents(),
            4,
        )))
        .unwrap();
    registry
        .register(Arc::new(ToolExecutor::new(Arc::clone(&model))))
        .unwrap();

    let supervisor = Arc::new(Supervisor::new(Arc::clone(&model), registry));
    let memory = MemoryBudgetController::new(db.history(), model, 3200, 2);
    Assistant::new(supervisor, db.history(), memory)
}

#[tokio::test]
async fn introduction_is_remembered_across_turns() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("t.db")).await.unwrap();

    let model = ScriptedModel::with(&[
        // --- query 1: introduction ---
        r#"{"tasks": [{"description": "Greet the user and acknowledge their name", "depends_on": []}]}"#,
        r#"{"executor": "conversational", "input": "Greet the user, who is Jun from China"}"#,
        "Nice to meet you, Jun from China!",
        "Nice to meet you, Jun!",
        // --- query 2: recall ---
        r#"{"tasks": [{"description": "Answer where the user is from", "depends_on": []}]}"#,
        r#"{"executor": "conversational", "input": "Where is the user from?"}"#,
        "You said you are from China.",
        "You're from China!",
    ]);
    let assistant = build_assistant(&db, model.clone() as Arc<dyn ModelProvider>);

    let first = assistant
        .handle_query("s1", "My name is Jun from China.")
        .await
        .unwrap();
    assert_eq!(first, "Nice to meet you, Jun!");

    let second = assistant
        .handle_query("s1", "Where am I from?")
        .await
        .unwrap();
    assert_eq!(second, "You're from China!");

    // the second query's conversational prompt saw the first exchange
    let prompts = model.prompts.lock().unwrap();
    let recall_prompt = &prompts[6][1].content;
    assert!(recall_prompt.contains("My name is Jun from China."));

    // both exchanges are persisted
    assert_eq!(db.history().turn_count("s1").await.unwrap(), 4);
}

#[tokio::test]
async fn arithmetic_is_delegated_to_the_tool_executor() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("t.db")).await.unwrap();

    let model = ScriptedModel::with(&[
        r#"{"tasks": [{"description": "Compute 3*312", "depends_on": []}]}"#,
        r#"{"executor": "tool", "input": "what's the result of 3*312"}"#,
        // tool executor's matching decision
        r#"{"needs_tool": true, "tool_name": "calculate", "confidence": 0.95,
            "arguments": {"expression": "3*312"}}"#,
        "3 * 312 = 936",
    ]);
    let assistant = build_assistant(&db, model.clone() as Arc<dyn ModelProvider>);

    let reply = assistant
        .handle_query("s1", "what's the result of 3*312")
        .await
        .unwrap();
    assert_eq!(reply, "3 * 312 = 936");

    // the computed value reached the synthesis prompt
    let prompts = model.prompts.lock().unwrap();
    let synthesis_prompt = &prompts[3][1].content;
    assert!(synthesis_prompt.contains("936"));
}

#[tokio::test]
async fn invented_executor_identity_degrades_to_self_execution() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("t.db")).await.unwrap();

    let model = ScriptedModel::with(&[
        r#"{"tasks": [{"description": "Do the thing", "depends_on": []}]}"#,
        // router invents an identity that was never registered
        r#"{"executor": "wizard", "input": "abracadabra"}"#,
        // supervisor handles the task itself
        "Handled it directly.",
        "All done.",
    ]);
    let assistant = build_assistant(&db, model.clone() as Arc<dyn ModelProvider>);

    let reply = assistant.handle_query("s1", "Do the thing").await.unwrap();
    assert_eq!(reply, "All done.");
    // plan + route + self-execution + synthesis, nothing extra
    assert_eq!(model.prompt_count(), 4);
}

#[tokio::test]
async fn dependent_tasks_see_earlier_results() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("t.db")).await.unwrap();

    let model = ScriptedModel::with(&[
        r#"{"tasks": [{"description": "Compute 6*7", "depends_on": []},
                      {"description": "Explain the result", "depends_on": [0]}]}"#,
        // task 1 -> tool
        r#"{"executor": "tool", "input": "6*7"}"#,
        r#"{"needs_tool": true, "tool_name": "multiply", "confidence": 0.9,
            "arguments": {"a": 6, "b": 7}}"#,
        // task 2 -> conversational; the router omits the input so the
        // default (description + transcript) is used
        r#"{"executor": "conversational"}"#,
        "42 is the product of 6 and 7.",
        "6*7 is 42, the product of the two.",
    ]);
    let assistant = build_assistant(&db, model.clone() as Arc<dyn ModelProvider>);

    let reply = assistant
        .handle_query("s1", "Compute 6*7 and explain it")
        .await
        .unwrap();
    assert_eq!(reply, "6*7 is 42, the product of the two.");

    // the dependent task's input carried the first task's result
    let prompts = model.prompts.lock().unwrap();
    let explain_prompt = &prompts[4][1].content;
    assert!(explain_prompt.contains("42"));
}

#[tokio::test]
async fn planner_outage_produces_an_apology_and_persists_the_exchange() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("t.db")).await.unwrap();

    let assistant = build_assistant(&db, Arc::new(OfflineModel));

    let reply = assistant.handle_query("s1", "anything").await.unwrap();
    assert!(reply.contains("couldn't complete"));

    // the failed exchange is still part of the conversation record
    let view = db.history().read_history("s1").await.unwrap();
    assert_eq!(view.turns.len(), 2);
    assert_eq!(view.turns[0].content, "anything");
    assert_eq!(view.turns[1].role, "assistant");
}

#[tokio::test]
async fn unparseable_plan_degrades_to_a_single_task() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("t.db")).await.unwrap();

    let model = ScriptedModel::with(&[
        // both plan attempts are garbage; the raw query becomes the task
        "not json",
        "still not json",
        r#"{"executor": "conversational", "input": "hello there"}"#,
        "Hi!",
        "Hi!",
    ]);
    let assistant = build_assistant(&db, model.clone() as Arc<dyn ModelProvider>);

    let reply = assistant.handle_query("s1", "hello there").await.unwrap();
    assert_eq!(reply, "Hi!");
}

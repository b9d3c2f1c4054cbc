use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use jqplay::engine::mock::{EngineCall, MockEngine};
use jqplay::engine::{EngineError, EngineOutput, EngineSlot};
use jqplay::orchestrator::{Orchestrator, OrchestratorConfig};
use jqplay::readiness::{ReadinessGate, TimeoutPolicy};
use jqplay::state::{NO_OUTPUT, RunState, RunStateCell};

fn orchestrator_with(slot: Arc<EngineSlot>, policy: TimeoutPolicy) -> Orchestrator {
    let gate = Arc::new(ReadinessGate::new(slot).with_policy(policy));
    Orchestrator::new(
        gate,
        Arc::new(RunStateCell::new()),
        OrchestratorConfig {
            engine_timeout: Duration::from_secs(2),
        },
    )
}

fn loaded(engine: MockEngine) -> (Orchestrator, Arc<MockEngine>) {
    let engine = Arc::new(engine);
    let slot = Arc::new(EngineSlot::new());
    slot.set(engine.clone());
    (orchestrator_with(slot, TimeoutPolicy::Retry), engine)
}

fn assert_completed(state: &RunState) {
    assert!(!state.busy, "busy after completion: {state:?}");
    let has_error = state.error.as_deref().is_some_and(|e| !e.is_empty());
    let has_output = !state.output.is_empty();
    assert!(has_error ^ has_output, "expected exactly one of error/output: {state:?}");
}

#[tokio::test]
async fn field_lookup_on_structured_input() {
    let (orchestrator, engine) =
        loaded(MockEngine::new().with_structured(Ok(EngineOutput::Value(json!(5)))));

    let state = orchestrator.run(".foo", r#"{"foo":5,"bar":"baz"}"#).await;

    assert_eq!(state.output, "5");
    assert_completed(&state);
    assert_eq!(
        engine.calls(),
        vec![EngineCall::Structured {
            value: json!({"foo": 5, "bar": "baz"}),
            filter: ".foo".into(),
        }]
    );
}

#[tokio::test]
async fn object_results_are_indented() {
    let (orchestrator, _) = loaded(MockEngine::new().with_structured(Ok(EngineOutput::Value(
        json!({"id": 1, "name": "Ada Lovelace"}),
    ))));

    let state = orchestrator
        .run(
            ".items[] | {id, name}",
            r#"{"items":[{"id":1,"name":"Ada Lovelace"}]}"#,
        )
        .await;

    assert_eq!(state.output, "{\n  \"id\": 1,\n  \"name\": \"Ada Lovelace\"\n}");
    assert_completed(&state);
}

#[tokio::test]
async fn textual_structured_results_are_verbatim() {
    let (orchestrator, _) =
        loaded(MockEngine::new().with_structured(Ok(EngineOutput::Text("baz".into()))));

    let state = orchestrator.run(".bar", r#"{"bar":"baz"}"#).await;
    assert_eq!(state.output, "baz");
}

#[tokio::test]
async fn non_json_input_takes_raw_path() {
    let (orchestrator, engine) = loaded(MockEngine::new().with_raw(Ok("raw result".into())));

    let state = orchestrator.run(".", "not json").await;

    assert_eq!(state.output, "raw result");
    assert_completed(&state);
    assert_eq!(
        engine.calls(),
        vec![EngineCall::Raw {
            text: "not json".into(),
            filter: ".".into(),
        }]
    );
}

#[tokio::test]
async fn empty_input_takes_raw_path() {
    let (orchestrator, engine) = loaded(MockEngine::new().with_raw(Ok("null".into())));

    orchestrator.run(".", "   ").await;

    assert_eq!(
        engine.calls(),
        vec![EngineCall::Raw {
            text: String::new(),
            filter: ".".into(),
        }]
    );
}

#[tokio::test]
async fn empty_filter_is_identity() {
    let (orchestrator, engine) =
        loaded(MockEngine::new().with_structured(Ok(EngineOutput::Value(json!([1])))));

    let empty = orchestrator.run("  ", "[1]").await;
    let dot = orchestrator.run(".", "[1]").await;

    assert_eq!(empty, dot);
    let filters: Vec<_> = engine
        .calls()
        .into_iter()
        .map(|call| match call {
            EngineCall::Structured { filter, .. } | EngineCall::Raw { filter, .. } => filter,
        })
        .collect();
    assert_eq!(filters, vec![".", "."]);
}

#[tokio::test]
async fn input_is_trimmed_before_classification() {
    let (orchestrator, engine) =
        loaded(MockEngine::new().with_structured(Ok(EngineOutput::Value(json!(1)))));

    orchestrator.run(".a", "\n\n  {\"a\":1}  \n").await;

    assert!(matches!(
        engine.calls().as_slice(),
        [EngineCall::Structured { value, .. }] if *value == json!({"a": 1})
    ));
}

#[tokio::test]
async fn engine_error_is_surfaced_verbatim() {
    let message = "jq: error: syntax error, unexpected $end (Unix shell quoting issues?)";
    let (orchestrator, _) =
        loaded(MockEngine::new().with_structured(Err(EngineError::Syntax(message.into()))));

    let state = orchestrator.run(".foo |", "{}").await;

    assert_eq!(state.error.as_deref(), Some(message));
    assert_eq!(state.output, "");
    assert_completed(&state);
}

#[tokio::test]
async fn raw_engine_error_is_surfaced() {
    let (orchestrator, _) = loaded(
        MockEngine::new().with_raw(Err(EngineError::Evaluation("Cannot iterate over null".into()))),
    );

    let state = orchestrator.run(".[]", "not json").await;
    assert_eq!(state.error.as_deref(), Some("Cannot iterate over null"));
    assert_completed(&state);
}

#[tokio::test]
async fn engine_panic_still_clears_busy() {
    let (orchestrator, _) = loaded(MockEngine::new().panicking());

    let state = orchestrator.run(".", "{}").await;

    assert_eq!(state.error.as_deref(), Some("engine panicked"));
    assert_completed(&state);
    assert_eq!(orchestrator.state().snapshot(), state);
}

#[tokio::test]
async fn empty_structured_result_is_marked() {
    let (orchestrator, _) =
        loaded(MockEngine::new().with_structured(Ok(EngineOutput::Text(String::new()))));

    let state = orchestrator.run("empty", r#"{"a":1}"#).await;

    assert_eq!(state.output, NO_OUTPUT);
    assert!(state.error.is_none());
    assert!(state.succeeded());
    assert_completed(&state);
}

#[tokio::test]
async fn empty_raw_result_is_marked() {
    let (orchestrator, _) = loaded(MockEngine::new().with_raw(Ok(String::new())));

    let state = orchestrator.run("select(false)", "not json").await;

    assert_eq!(state.output, NO_OUTPUT);
    assert_completed(&state);
}

#[tokio::test]
async fn failure_after_success_clears_output() {
    let (orchestrator, _) = loaded(
        MockEngine::new()
            .with_structured(Ok(EngineOutput::Value(json!(1))))
            .with_structured(Err(EngineError::Evaluation("boom".into()))),
    );

    let ok = orchestrator.run(".", "1").await;
    assert_eq!(ok.output, "1");

    let failed = orchestrator.run(".", "1").await;
    assert_eq!(failed.output, "");
    assert_eq!(failed.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let (orchestrator, _) = loaded(
        MockEngine::new().with_structured(Ok(EngineOutput::Value(json!({"id": 2})))),
    );

    let first = orchestrator.run(".items[0]", r#"{"items":[{"id":2}]}"#).await;
    let second = orchestrator.run(".items[0]", r#"{"items":[{"id":2}]}"#).await;

    assert_eq!(first.output, second.output);
    assert_eq!(orchestrator.runs_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_engine_times_out() {
    let orchestrator = orchestrator_with(Arc::new(EngineSlot::new()), TimeoutPolicy::Retry);

    let state = orchestrator.run(".", "{}").await;

    let error = state.error.as_deref().unwrap();
    assert!(error.contains("failed to load"), "{error}");
    assert_eq!(state.output, "");
    assert_completed(&state);
}

#[tokio::test(start_paused = true)]
async fn late_engine_is_used_on_retry() {
    let slot = Arc::new(EngineSlot::new());
    let orchestrator = orchestrator_with(Arc::clone(&slot), TimeoutPolicy::Retry);

    let first = orchestrator.run(".", "{}").await;
    assert!(first.error.is_some());

    slot.set(Arc::new(
        MockEngine::new().with_structured(Ok(EngineOutput::Value(json!({})))),
    ));
    let second = orchestrator.run(".", "{}").await;
    assert_eq!(second.output, "{}");
}

#[tokio::test(start_paused = true)]
async fn sticky_timeout_holds_until_reset() {
    let slot = Arc::new(EngineSlot::new());
    let orchestrator = orchestrator_with(Arc::clone(&slot), TimeoutPolicy::Sticky);

    let first = orchestrator.run(".", "text").await;
    assert!(first.error.is_some());
    assert_completed(&first);

    let started = tokio::time::Instant::now();
    let second = orchestrator.run(".", "text").await;
    assert_eq!(second.error, first.error);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(orchestrator.gate().waits_started(), 1);

    orchestrator.reset_readiness();
    let loader = {
        let slot = Arc::clone(&slot);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            slot.set(Arc::new(MockEngine::new().with_raw(Ok("ready".into()))));
        })
    };

    let third = orchestrator.run(".", "text").await;
    loader.await.unwrap();
    assert_eq!(third.output, "ready");
    assert_completed(&third);
    assert_eq!(orchestrator.gate().waits_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn engine_arriving_mid_wait_is_used() {
    let slot = Arc::new(EngineSlot::new());
    let orchestrator = orchestrator_with(Arc::clone(&slot), TimeoutPolicy::Sticky);

    let loader = {
        let slot = Arc::clone(&slot);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            slot.set(Arc::new(MockEngine::new().with_raw(Ok("late".into()))));
        })
    };

    let state = orchestrator.run(".", "text").await;
    loader.await.unwrap();
    assert_eq!(state.output, "late");
}

#[tokio::test(start_paused = true)]
async fn busy_is_visible_while_running() {
    let engine = MockEngine::new()
        .with_delay(Duration::from_millis(500))
        .with_raw(Ok("done".into()));
    let (orchestrator, _) = loaded(engine);
    let orchestrator = Arc::new(orchestrator);
    let mut rx = orchestrator.state().subscribe();

    let task = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run(".", "x").await })
    };

    rx.wait_for(|s| s.busy).await.unwrap();
    assert_eq!(orchestrator.state().snapshot(), RunState::running());

    let finished = task.await.unwrap();
    assert_eq!(finished.output, "done");
    assert!(!orchestrator.state().snapshot().busy);
}

#[tokio::test(start_paused = true)]
async fn overlapping_runs_last_writer_wins() {
    // Every call takes 300ms, so the run started second finishes last.
    let engine = MockEngine::new()
        .with_delay(Duration::from_millis(300))
        .with_raw(Ok("first".into()))
        .with_raw(Ok("second".into()));
    let (orchestrator, _) = loaded(engine);
    let orchestrator = Arc::new(orchestrator);

    let slow = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run(".", "a").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fast = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run(".", "b").await })
    };

    let slow = slow.await.unwrap();
    let fast = fast.await.unwrap();

    assert_eq!(slow.output, "first");
    assert_eq!(fast.output, "second");
    assert_eq!(orchestrator.state().snapshot(), fast);
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flowline_engine::{
  ChannelNotifier, EngineConfig, EngineError, ExecutionEvent, WorkflowEngine,
};
use flowline_executor::{
  ExecutionContext, ExecutorParams, ExecutorRegistry, HttpRequestExecutor, NodeError,
  NodeExecutor,
};
use flowline_step::{RetryPolicy, StepJournal};
use flowline_workflow::{NodeDef, NodeType, SequenceError, Workflow};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Records every node it runs and adds `<node_id>: true` to the context.
#[derive(Default)]
struct Recorder {
  calls: Mutex<Vec<String>>,
}

impl Recorder {
  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl NodeExecutor for Recorder {
  async fn execute(&self, params: ExecutorParams<'_>) -> Result<ExecutionContext, NodeError> {
    self.calls.lock().unwrap().push(params.node_id.to_string());
    if params.data.get("fail").is_some() {
      return Err(NodeError::configuration(NodeType::HttpRequest, "bad config"));
    }
    let mut context = params.context;
    context.insert(params.node_id, json!(true));
    Ok(context)
  }
}

fn config() -> EngineConfig {
  EngineConfig {
    retry: RetryPolicy {
      max_attempts: 1,
      initial_delay: Duration::ZERO,
      ..RetryPolicy::default()
    },
    ..EngineConfig::default()
  }
}

fn engine_with_recorder() -> (
  WorkflowEngine<ChannelNotifier>,
  Arc<Recorder>,
  mpsc::UnboundedReceiver<ExecutionEvent>,
) {
  let recorder = Arc::new(Recorder::default());
  let mut registry = ExecutorRegistry::standard(HttpRequestExecutor::default());
  registry.register(NodeType::HttpRequest, recorder.clone());
  let (notifier, events) = ChannelNotifier::channel();
  (
    WorkflowEngine::with_registry(config(), registry, notifier),
    recorder,
    events,
  )
}

fn http_engine() -> (
  WorkflowEngine<ChannelNotifier>,
  mpsc::UnboundedReceiver<ExecutionEvent>,
) {
  let (notifier, events) = ChannelNotifier::channel();
  (
    WorkflowEngine::with_notifier(config(), notifier).unwrap(),
    events,
  )
}

fn workflow(nodes: Vec<NodeDef>, connections: &[(&str, &str)]) -> Workflow {
  let mut workflow = Workflow::new("wf", "Test");
  for node in nodes {
    workflow.insert_node(node).unwrap();
  }
  for (source, target) in connections {
    workflow.connect(*source, *target).unwrap();
  }
  workflow
}

fn http(id: &str, data: Value) -> NodeDef {
  NodeDef::new(id, NodeType::HttpRequest).with_data(data)
}

fn drain(events: &mut mpsc::UnboundedReceiver<ExecutionEvent>) -> Vec<ExecutionEvent> {
  let mut drained = Vec::new();
  while let Ok(event) = events.try_recv() {
    drained.push(event);
  }
  drained
}

/// Compact `event:node` labels for asserting event order.
fn labels(events: &[ExecutionEvent]) -> Vec<String> {
  events
    .iter()
    .map(|event| match event {
      ExecutionEvent::WorkflowStarted { .. } => "workflow_started".to_string(),
      ExecutionEvent::NodeStarted { node_id, .. } => format!("node_started:{node_id}"),
      ExecutionEvent::NodeCompleted { node_id, .. } => format!("node_completed:{node_id}"),
      ExecutionEvent::NodeFailed { node_id, .. } => format!("node_failed:{node_id}"),
      ExecutionEvent::WorkflowCompleted { .. } => "workflow_completed".to_string(),
      ExecutionEvent::WorkflowFailed { .. } => "workflow_failed".to_string(),
    })
    .collect()
}

#[tokio::test]
async fn http_nodes_thread_context_through_the_run() {
  let mut server = mockito::Server::new_async().await;
  let user = server
    .mock("GET", "/users/ada")
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(r#"{"id": 7, "name": "Ada"}"#)
    .create_async()
    .await;
  let notify = server
    .mock("POST", "/notify")
    .match_body(mockito::Matcher::Json(json!({ "id": 7, "name": "Ada" })))
    .with_status(200)
    .with_body("ok")
    .create_async()
    .await;

  let workflow = workflow(
    vec![
      NodeDef::new("trigger", NodeType::ManualTrigger),
      http(
        "notify",
        json!({
          "variableName": "notified",
          "endpoint": format!("{}/notify", server.url()),
          "method": "POST",
          "body": "{\"id\": {{ profile.httpResponse.data.id }}, \"name\": {{ json profile.httpResponse.data.name }}}"
        }),
      ),
      http(
        "fetch",
        json!({
          "variableName": "profile",
          "endpoint": format!("{}/users/{{{{ user }}}}", server.url()),
          "method": "GET"
        }),
      ),
    ],
    &[("trigger", "fetch"), ("fetch", "notify")],
  );
  let (engine, mut events) = http_engine();

  let result = engine
    .execute(&workflow, json!({ "user": "ada" }))
    .await
    .unwrap();

  user.assert_async().await;
  notify.assert_async().await;
  assert_eq!(result.nodes_executed, vec!["trigger", "fetch", "notify"]);
  assert_eq!(result.context.get("user"), Some(&json!("ada")));
  assert_eq!(
    result.context.lookup("profile.httpResponse.data.name"),
    Some(&json!("Ada"))
  );
  assert_eq!(
    result.context.lookup("notified.httpResponse"),
    Some(&json!({ "status": 200, "statusText": "OK", "data": "ok" }))
  );

  let events = drain(&mut events);
  assert!(events.iter().all(|e| e.execution_id() == result.execution_id));
  assert_eq!(
    labels(&events),
    vec![
      "workflow_started",
      "node_started:trigger",
      "node_completed:trigger",
      "node_started:fetch",
      "node_completed:fetch",
      "node_started:notify",
      "node_completed:notify",
      "workflow_completed",
    ]
  );
}

#[tokio::test]
async fn cycle_aborts_before_any_node_runs() {
  let workflow = workflow(
    vec![http("a", json!({})), http("b", json!({})), http("c", json!({}))],
    &[("a", "b"), ("b", "a")],
  );
  let (engine, recorder, mut events) = engine_with_recorder();

  let err = engine.execute(&workflow, json!({})).await.unwrap_err();

  assert!(matches!(
    err,
    EngineError::Sequence(SequenceError::Cycle { .. })
  ));
  assert!(recorder.calls().is_empty());
  assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn first_failure_halts_the_run() {
  let workflow = workflow(
    vec![
      http("a", json!({})),
      http("b", json!({ "fail": true })),
      http("c", json!({})),
    ],
    &[("a", "b"), ("b", "c")],
  );
  let (engine, recorder, mut events) = engine_with_recorder();

  let err = engine.execute(&workflow, json!({})).await.unwrap_err();

  assert_eq!(err.node_id(), Some("b"));
  assert!(matches!(
    err,
    EngineError::Node { source: NodeError::Configuration { .. }, .. }
  ));
  assert_eq!(recorder.calls(), vec!["a", "b"]);

  let events = drain(&mut events);
  assert_eq!(
    labels(&events),
    vec![
      "workflow_started",
      "node_started:a",
      "node_completed:a",
      "node_started:b",
      "node_failed:b",
      "workflow_failed",
    ]
  );
  assert!(matches!(
    events.last(),
    Some(ExecutionEvent::WorkflowFailed { error, .. }) if error == "node 'b' failed: bad config"
  ));
}

#[tokio::test]
async fn isolated_nodes_run_in_input_order() {
  let workflow = workflow(
    vec![http("x", json!({})), http("y", json!({})), http("z", json!({}))],
    &[],
  );
  let (engine, recorder, _events) = engine_with_recorder();

  let result = engine.execute(&workflow, json!({})).await.unwrap();

  assert_eq!(result.nodes_executed, vec!["x", "y", "z"]);
  assert_eq!(recorder.calls(), vec!["x", "y", "z"]);
  assert_eq!(
    result.context.into_value(),
    json!({ "x": true, "y": true, "z": true })
  );
}

#[tokio::test]
async fn non_object_payload_is_stored_under_payload_key() {
  let workflow = workflow(vec![NodeDef::new("trigger", NodeType::ManualTrigger)], &[]);
  let (engine, _events) = http_engine();

  let result = engine.execute(&workflow, json!([1, 2, 3])).await.unwrap();

  assert_eq!(result.context.into_value(), json!({ "payload": [1, 2, 3] }));
}

#[tokio::test]
async fn resume_replays_completed_steps() {
  let mut server = mockito::Server::new_async().await;
  let first = server
    .mock("GET", "/first")
    .with_status(200)
    .with_body(r#"{"n": 1}"#)
    .expect(1)
    .create_async()
    .await;
  let failing = server
    .mock("GET", "/second")
    .with_status(503)
    .create_async()
    .await;

  let workflow = workflow(
    vec![
      NodeDef::new("trigger", NodeType::ManualTrigger),
      http(
        "first",
        json!({
          "variableName": "first",
          "endpoint": format!("{}/first", server.url()),
          "method": "GET"
        }),
      ),
      http(
        "second",
        json!({
          "variableName": "second",
          "endpoint": format!("{}/second", server.url()),
          "method": "GET"
        }),
      ),
    ],
    &[("trigger", "first"), ("first", "second")],
  );
  let (engine, _events) = http_engine();

  let (result, journal) = engine
    .resume(&workflow, json!({}), StepJournal::new())
    .await;
  assert_eq!(result.unwrap_err().node_id(), Some("second"));
  assert_eq!(
    journal.names().collect::<Vec<_>>(),
    vec!["first/http-request", "trigger/manual-trigger"]
  );

  failing.remove_async().await;
  let recovered = server
    .mock("GET", "/second")
    .with_status(200)
    .with_body(r#"{"n": 2}"#)
    .create_async()
    .await;

  let (result, journal) = engine.resume(&workflow, json!({}), journal).await;
  let result = result.unwrap();

  first.assert_async().await;
  recovered.assert_async().await;
  assert_eq!(
    result.context.lookup("first.httpResponse.data.n"),
    Some(&json!(1))
  );
  assert_eq!(
    result.context.lookup("second.httpResponse.data.n"),
    Some(&json!(2))
  );
  assert_eq!(journal.len(), 3);
}

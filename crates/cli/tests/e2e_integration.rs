//! End-to-end integration tests for calcgrid.
//!
//! These tests run the orchestrator on an ephemeral port and drive it over
//! real HTTP, either by hand or with a worker agent.

use std::sync::Arc;
use std::time::Duration;

use calcgrid_config::AppConfig;
use calcgrid_core::protocol::{CalculateResponse, ExpressionList, TaskResultRequest};
use calcgrid_core::{ExpressionRegistry, ExpressionStatus, OperationLimits, Operator};
use calcgrid_worker::{AgentError, Coordinator, HttpCoordinator, Worker};
use tokio::net::TcpListener;

// ── Harness ──────────────────────────────────────────────────────────────

/// Start an orchestrator on 127.0.0.1:0 and return its base URL.
async fn spawn_orchestrator(limits: OperationLimits) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(ExpressionRegistry::new(limits));
    tokio::spawn(calcgrid_gateway::serve(listener, state));
    format!("http://{addr}")
}

async fn submit(client: &reqwest::Client, base: &str, expression: &str) -> reqwest::Response {
    client
        .post(format!("{base}/api/v1/calculate"))
        .json(&serde_json::json!({ "expression": expression }))
        .send()
        .await
        .unwrap()
}

async fn list(client: &reqwest::Client, base: &str) -> ExpressionList {
    client
        .get(format!("{base}/api/v1/expressions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn worker_evaluates_expressions_over_http() {
    let base = spawn_orchestrator(OperationLimits::uniform(Duration::from_secs(5))).await;
    let client = reqwest::Client::new();

    let cases = [
        ("2+2*4", 10.0),
        ("4*2+3*5", 23.0),
        ("1-2*3", -5.0),
        ("(10-4)/(1+2)", 2.0),
        ("3", 3.0),
    ];
    for (i, (text, _)) in cases.iter().enumerate() {
        let response = submit(&client, &base, text).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let created: CalculateResponse = response.json().await.unwrap();
        assert_eq!(created.id.0, i as u32);
    }

    let worker = Worker::new(
        Arc::new(HttpCoordinator::new(base.clone()).unwrap()),
        2,
        Duration::from_millis(10),
    );
    let done = {
        let client = client.clone();
        let base = base.clone();
        async move {
            loop {
                let listing = list(&client, &base).await;
                if listing.expressions.iter().all(|e| e.status.is_terminal()) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(15), worker.run_until(done))
        .await
        .expect("expressions were not completed in time");

    let listing = list(&client, &base).await;
    assert_eq!(listing.expressions.len(), cases.len());
    for (snapshot, (text, expected)) in listing.expressions.iter().zip(cases) {
        assert_eq!(snapshot.status, ExpressionStatus::Completed, "{text}");
        assert_eq!(snapshot.result, Some(expected), "{text}");
    }
}

#[tokio::test]
async fn coordinator_fetches_and_submits_by_hand() {
    let base = spawn_orchestrator(OperationLimits::uniform(Duration::from_secs(5))).await;
    let client = reqwest::Client::new();
    let coordinator = HttpCoordinator::new(format!("{base}/")).unwrap();

    assert!(coordinator.fetch_task().await.unwrap().is_none());

    submit(&client, &base, "6/3").await;
    let task = coordinator.fetch_task().await.unwrap().unwrap();
    assert_eq!(task.operation, Operator::Div);
    assert_eq!((task.arg1, task.arg2), (6.0, 3.0));
    assert_eq!(task.operation_time_ms, 5000);

    let result = TaskResultRequest {
        id: task.id,
        result: 2.0,
    };
    coordinator.submit_result(&result).await.unwrap();

    // The record was consumed; a repeat is refused.
    let err = coordinator.submit_result(&result).await.unwrap_err();
    assert!(matches!(err, AgentError::Rejected { status: 404, .. }));

    let snapshot: serde_json::Value = client
        .get(format!("{base}/api/v1/expressions/0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["expression"]["status"], "completed");
    assert_eq!(snapshot["expression"]["result"], 2.0);
}

#[tokio::test]
async fn late_result_is_refused_with_timeout() {
    let base = spawn_orchestrator(OperationLimits::uniform(Duration::from_millis(1))).await;
    let client = reqwest::Client::new();
    let coordinator = HttpCoordinator::new(base.clone()).unwrap();

    submit(&client, &base, "(1+2)*(3+4)").await;
    let first = coordinator.fetch_task().await.unwrap().unwrap();
    let second = coordinator.fetch_task().await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = coordinator
        .submit_result(&TaskResultRequest {
            id: first.id,
            result: 3.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Rejected { status: 408, .. }));

    let err = coordinator
        .submit_result(&TaskResultRequest {
            id: second.id,
            result: 7.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Rejected { status: 404, .. }));

    let listing = list(&client, &base).await;
    assert_eq!(listing.expressions[0].status, ExpressionStatus::Cancelled);
    assert!(coordinator.fetch_task().await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_expressions_are_refused() {
    let base = spawn_orchestrator(OperationLimits::uniform(Duration::from_secs(1))).await;
    let client = reqwest::Client::new();

    for text in ["2++2*4", "4*(2+3", "8+2/3)", "4*()2+3", "two+two"] {
        let response = submit(&client, &base, text).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            "{text}"
        );
    }
    assert!(list(&client, &base).await.expressions.is_empty());
}

#[tokio::test]
async fn orchestrator_refuses_to_start_without_operation_times() {
    let mut config = AppConfig::default();
    config.gateway.port = 0;
    let err = calcgrid_gateway::start(config).await.unwrap_err();
    assert!(err.to_string().contains("TIME_ADDITION_MS"));
}

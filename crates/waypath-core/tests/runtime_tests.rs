use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use waypath_core::{
    domain::repository::memory::{
        MemoryGraphRepository, MemoryTokenAccountRepository, MemoryTripRepository,
        MemoryWeightUpdateRequestRepository,
    },
    CoreConfig, CoreError, Decision, DecisionOutcome, ErrorKind, HistoryFilter, PrincipalId,
    ProposalOutcome, Repositories, RequestStatus, RuntimeInterface,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("waypath_core=debug")
        .with_test_writer()
        .try_init();
}

fn runtime() -> RuntimeInterface {
    init_tracing();
    let repositories = Repositories {
        graphs: Arc::new(MemoryGraphRepository::new()),
        accounts: Arc::new(MemoryTokenAccountRepository::new()),
        requests: Arc::new(MemoryWeightUpdateRequestRepository::new()),
        trips: Arc::new(MemoryTripRepository::new()),
    };
    RuntimeInterface::create_with_repositories(repositories, &CoreConfig::default()).unwrap()
}

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[tokio::test]
async fn test_graph_lifecycle() {
    let runtime = runtime();
    let alice = PrincipalId::from("alice");
    let bob = PrincipalId::from("bob");
    runtime.refill(&alice, 5.0).await.unwrap();
    runtime.refill(&bob, 1.0).await.unwrap();

    // Creation is charged once, at the frozen price
    let created = runtime
        .create_graph(&alice, &json!({"A": {"B": 3, "C": 5}, "B": {"C": 1}}))
        .await
        .unwrap();
    assert_eq!(created.cost, 0.26);
    approx(runtime.get_balance(&alice).await.unwrap(), 4.74);

    // Every execution costs the executor the same amount
    let execution = runtime
        .compute_path(&created.graph_id, &bob, "A", "C")
        .await
        .unwrap();
    assert_eq!(execution.path, vec!["A", "B", "C"]);
    assert_eq!(execution.cost, 4.0);
    approx(execution.residual_balance, 0.74);

    // Small correction blends in immediately
    let outcome = runtime
        .propose_weight_update(&created.graph_id, "A", "B", 4.0, &bob)
        .await
        .unwrap();
    match outcome {
        ProposalOutcome::AutoApplied { new_weight } => approx(new_weight, 3.1),
        other => panic!("expected auto-apply, got {:?}", other),
    }

    // Large swing waits for review
    let request_id = match runtime
        .propose_weight_update(&created.graph_id, "A", "B", 10.0, &bob)
        .await
        .unwrap()
    {
        ProposalOutcome::Queued { request_id } => request_id,
        other => panic!("expected queued proposal, got {:?}", other),
    };
    let pending = runtime.list_pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request_id);

    let decision = runtime
        .decide_weight_update(&request_id, Decision::Approved)
        .await
        .unwrap();
    match decision {
        DecisionOutcome::Approved { new_weight, .. } => approx(new_weight, 3.79),
        other => panic!("expected approval, got {:?}", other),
    }
    assert!(runtime.list_pending_requests().await.unwrap().is_empty());

    let graph = runtime.get_graph(&created.graph_id).await.unwrap();
    approx(graph.adjacency.weight("A", "B").unwrap(), 3.79);
    assert_eq!(graph.cost, 0.26);

    let second = runtime
        .compute_path(&created.graph_id, &bob, "A", "C")
        .await
        .unwrap();
    assert_eq!(second.path, vec!["A", "B", "C"]);
    approx(second.cost, 4.79);
    approx(second.residual_balance, 0.48);

    let trips = runtime.list_trips(Some(&bob)).await.unwrap();
    assert_eq!(trips.len(), 2);
    assert_eq!(trips[0].id, execution.trip_id);
    assert_eq!(trips[1].id, second.trip_id);
    assert!(runtime.list_trips(Some(&alice)).await.unwrap().is_empty());

    let balances = runtime.list_balances().await.unwrap();
    let principals: Vec<&str> = balances.iter().map(|account| account.principal.0.as_str()).collect();
    assert_eq!(principals, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_failures_leave_no_trace() {
    let runtime = runtime();
    let carol = PrincipalId::from("carol");
    runtime.refill(&carol, 0.2).await.unwrap();

    let err = runtime
        .create_graph(&carol, &json!({"A": {"B": 1, "C": 1}, "B": {"C": 1}}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientTokens);
    assert!(runtime.list_graphs(None).await.unwrap().is_empty());
    assert_eq!(runtime.get_balance(&carol).await.unwrap(), 0.2);

    for payload in [json!({}), json!([1, 2]), json!({"A": {"B": 0}}), json!({"A": {"B": "x"}})] {
        let err = runtime.create_graph(&carol, &payload).await.unwrap_err();
        assert_eq!(err.kind().as_str(), "INVALID_GRAPH", "payload {payload}");
    }

    // A refill that would be negative is refused outright
    assert!(matches!(
        runtime.refill(&carol, -1.0).await,
        Err(CoreError::InvalidAmount(_))
    ));
    assert_eq!(runtime.get_balance(&carol).await.unwrap(), 0.2);
}

#[tokio::test]
async fn test_deleted_graph_requests_fail_closed() {
    let runtime = runtime();
    let alice = PrincipalId::from("alice");
    runtime.refill(&alice, 1.0).await.unwrap();
    let created = runtime
        .create_graph(&alice, &json!({"A": {"B": 2}}))
        .await
        .unwrap();

    let request_id = match runtime
        .propose_weight_update(&created.graph_id, "A", "B", 50.0, &alice)
        .await
        .unwrap()
    {
        ProposalOutcome::Queued { request_id } => request_id,
        other => panic!("expected queued proposal, got {:?}", other),
    };

    runtime.delete_graph(&created.graph_id).await.unwrap();
    assert!(matches!(
        runtime.delete_graph(&created.graph_id).await,
        Err(CoreError::GraphNotFound(_))
    ));

    let err = runtime
        .decide_weight_update(&request_id, Decision::Approved)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GraphNotFound);
    assert_eq!(runtime.list_pending_requests().await.unwrap().len(), 1);

    // Rejecting is still possible and touches nothing
    let outcome = runtime
        .decide_weight_update(&request_id, Decision::Rejected)
        .await
        .unwrap();
    assert_eq!(outcome, DecisionOutcome::Rejected { request_id });
}

#[tokio::test]
async fn test_weight_update_history_filters() {
    let runtime = runtime();
    let alice = PrincipalId::from("alice");
    runtime.refill(&alice, 2.0).await.unwrap();
    let first = runtime
        .create_graph(&alice, &json!({"A": {"B": 1}}))
        .await
        .unwrap();
    let second = runtime
        .create_graph(&alice, &json!({"X": {"Y": 1}}))
        .await
        .unwrap();

    let before = Utc::now() - Duration::seconds(1);
    for proposed in [5.0, 6.0] {
        runtime
            .propose_weight_update(&first.graph_id, "A", "B", proposed, &alice)
            .await
            .unwrap();
    }
    runtime
        .propose_weight_update(&second.graph_id, "X", "Y", 9.0, &alice)
        .await
        .unwrap();

    let pending = runtime.list_pending_requests().await.unwrap();
    assert_eq!(pending.len(), 3);
    runtime
        .decide_weight_update(&pending[0].id, Decision::Rejected)
        .await
        .unwrap();

    let all = runtime.weight_update_history(HistoryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|pair| pair[0].created_at <= pair[1].created_at));

    let for_first = runtime
        .weight_update_history(HistoryFilter {
            graph_id: Some(first.graph_id.clone()),
            ..HistoryFilter::default()
        })
        .await
        .unwrap();
    let statuses: Vec<RequestStatus> = for_first.iter().map(|request| request.status).collect();
    assert_eq!(statuses, vec![RequestStatus::Rejected, RequestStatus::Pending]);

    let in_window = runtime
        .weight_update_history(HistoryFilter {
            graph_id: None,
            created_from: Some(before),
            created_to: Some(Utc::now()),
        })
        .await
        .unwrap();
    assert_eq!(in_window.len(), 3);

    let too_early = runtime
        .weight_update_history(HistoryFilter {
            graph_id: None,
            created_from: None,
            created_to: Some(before),
        })
        .await
        .unwrap();
    assert!(too_early.is_empty());
}

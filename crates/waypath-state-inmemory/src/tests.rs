use crate::{InMemoryStateStoreProvider, StoreStats};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use waypath_core::{
    Adjacency, CoreConfig, CoreError, Graph, PrincipalId, ProposalOutcome, RequestStatus,
    RuntimeInterface, TokenAccount, WeightUpdateQuery, WeightUpdateRequest,
};

fn graph(owner: &str) -> Graph {
    Graph::new(
        PrincipalId::from(owner),
        Adjacency::from_edges([("A", "B", 2.0), ("B", "C", 1.0)]).unwrap(),
        0.24,
    )
}

#[tokio::test]
async fn test_graph_repository() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let repos = provider.create_repositories();

    let mine = graph("alice");
    let theirs = graph("bob");
    repos.graphs.insert(&mine).await?;
    repos.graphs.insert(&theirs).await?;

    // Duplicate IDs are refused
    assert!(matches!(
        repos.graphs.insert(&mine).await,
        Err(CoreError::StateStoreError(_))
    ));

    let found = repos.graphs.find_by_id(&mine.id).await?;
    assert_eq!(found.as_ref(), Some(&mine));

    let alice = PrincipalId::from("alice");
    let listed = repos.graphs.list(Some(&alice)).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, mine.id);
    assert_eq!(repos.graphs.list(None).await?.len(), 2);

    repos.graphs.delete(&mine.id).await?;
    assert!(repos.graphs.find_by_id(&mine.id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_failed_graph_mutation_is_discarded() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let repos = provider.create_repositories();
    let stored = graph("alice");
    repos.graphs.insert(&stored).await?;

    let result = repos
        .graphs
        .update(
            &stored.id,
            Box::new(|graph: &mut Graph| {
                graph.adjacency.set_weight("A", "B", 7.0)?;
                graph.adjacency.set_weight("C", "A", 1.0)?;
                Ok(())
            }),
        )
        .await;
    assert!(matches!(result, Err(CoreError::EdgeNotFound { .. })));

    let unchanged = repos.graphs.find_by_id(&stored.id).await?.unwrap();
    assert_eq!(unchanged.adjacency.weight("A", "B"), Some(2.0));

    let missing = graph("nobody");
    assert!(matches!(
        repos
            .graphs
            .update(&missing.id, Box::new(|_graph: &mut Graph| Ok(())))
            .await,
        Err(CoreError::GraphNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_account_created_only_on_success() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let repos = provider.create_repositories();
    let ghost = PrincipalId::from("ghost");

    let refused = repos
        .accounts
        .update(&ghost, Box::new(|account: &mut TokenAccount| account.debit(1.0)))
        .await;
    assert!(matches!(refused, Err(CoreError::InsufficientTokens { .. })));
    assert!(repos.accounts.find(&ghost).await?.is_none());

    let credited = repos
        .accounts
        .update(&ghost, Box::new(|account: &mut TokenAccount| account.credit(3.0)))
        .await?;
    assert_eq!(credited.balance, 3.0);
    assert_eq!(repos.accounts.list().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_request_queries() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let repos = provider.create_repositories();
    let stored = graph("alice");
    let before = Utc::now() - Duration::seconds(5);

    let first = WeightUpdateRequest::new(stored.id.clone(), "A", "B", 9.0, PrincipalId::from("bob"));
    let second = WeightUpdateRequest::new(stored.id.clone(), "B", "C", 9.0, PrincipalId::from("bob"));
    repos.requests.insert(&first).await?;
    repos.requests.insert(&second).await?;

    repos
        .requests
        .update(
            &first.id,
            Box::new(|request: &mut WeightUpdateRequest| {
                request.resolve(waypath_core::Decision::Rejected)
            }),
        )
        .await?;

    let pending = repos.requests.find(&WeightUpdateQuery::pending()).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let all = repos.requests.find(&WeightUpdateQuery::default()).await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].status, RequestStatus::Rejected);

    let none = repos
        .requests
        .find(&WeightUpdateQuery {
            created_to: Some(before),
            ..WeightUpdateQuery::default()
        })
        .await?;
    assert!(none.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_provider_shares_state_between_handles() {
    let provider = InMemoryStateStoreProvider::new();
    let first = RuntimeInterface::create_with_repositories(
        provider.create_repositories(),
        &CoreConfig::default(),
    )
    .unwrap();
    let second = RuntimeInterface::create_with_repositories(
        provider.create_repositories(),
        &CoreConfig::default(),
    )
    .unwrap();

    let alice = PrincipalId::from("alice");
    first.refill(&alice, 2.0).await.unwrap();
    let created = first
        .create_graph(&alice, &json!({"A": {"B": 4}}))
        .await
        .unwrap();

    assert_eq!(second.get_graph(&created.graph_id).await.unwrap().cost, 0.12);
    assert!((second.get_balance(&alice).await.unwrap() - 1.88).abs() < 1e-9);

    let outcome = second
        .propose_weight_update(&created.graph_id, "A", "B", 40.0, &alice)
        .await
        .unwrap();
    assert!(matches!(outcome, ProposalOutcome::Queued { .. }));

    second
        .compute_path(&created.graph_id, &alice, "A", "B")
        .await
        .unwrap();

    assert_eq!(
        provider.stats().await,
        StoreStats {
            graphs: 1,
            accounts: 1,
            requests: 1,
            trips: 1,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refills_accumulate() {
    let provider = InMemoryStateStoreProvider::new();
    let runtime = Arc::new(
        RuntimeInterface::create_with_repositories(
            provider.create_repositories(),
            &CoreConfig::default(),
        )
        .unwrap(),
    );
    let alice = PrincipalId::from("alice");

    let mut handles = Vec::new();
    for _ in 0..25 {
        let runtime = runtime.clone();
        let alice = alice.clone();
        handles.push(tokio::spawn(async move {
            runtime.refill(&alice, 4.0).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(runtime.get_balance(&alice).await.unwrap(), 100.0);
}

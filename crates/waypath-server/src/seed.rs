//! Startup data: initial balances and the demo graphs

use serde_json::json;
use tracing::info;
use waypath_core::{Adjacency, CreatedGraph, PrincipalId, RuntimeInterface};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// What seeding stored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedReport {
    /// Accounts credited
    pub accounts: usize,

    /// Demo graphs stored, with their owners
    pub graphs: Vec<(PrincipalId, CreatedGraph)>,
}

/// Demo graphs and their owners
pub fn demo_graphs() -> ServerResult<Vec<(PrincipalId, Adjacency)>> {
    let graphs = [
        (
            "valeria",
            json!({
                "A": {"B": 3, "C": 2, "D": 4},
                "B": {"C": 1, "E": 6},
                "C": {"F": 5, "D": 2},
                "D": {"G": 3, "C": 2},
                "E": {"D": 4, "H": 2},
                "F": {"G": 1, "E": 2, "H": 1},
                "G": {"H": 3},
                "H": {"A": 2, "B": 1}
            }),
        ),
        (
            "valeria",
            json!({
                "A": {"B": 1, "C": 2},
                "B": {"D": 3, "E": 4},
                "C": {"F": 2, "G": 5},
                "D": {"H": 1, "A": 2},
                "E": {"F": 3, "H": 2},
                "F": {"G": 1, "B": 2},
                "G": {"H": 1, "C": 1},
                "H": {"A": 1, "D": 2}
            }),
        ),
        (
            "giacomo",
            json!({
                "A": {"B": 2, "C": 3, "D": 4},
                "B": {"E": 2, "F": 3},
                "C": {"G": 1},
                "D": {"H": 2, "C": 2},
                "E": {"F": 1, "G": 2},
                "F": {"H": 2, "A": 3},
                "G": {"B": 2, "D": 2},
                "H": {"C": 1, "E": 1}
            }),
        ),
        (
            "giacomo",
            json!({
                "A": {"B": 1, "C": 1},
                "B": {"D": 1, "E": 1},
                "C": {"F": 1, "G": 1},
                "D": {"H": 1, "A": 1},
                "E": {"C": 1, "H": 1},
                "F": {"B": 1, "G": 1},
                "G": {"H": 1, "D": 1},
                "H": {"A": 1, "E": 1}
            }),
        ),
    ];

    graphs
        .into_iter()
        .map(|(owner, payload)| {
            let adjacency = Adjacency::from_json(&payload)
                .map_err(|e| ServerError::SeedError(format!("demo graph for {}: {}", owner, e)))?;
            Ok((PrincipalId::from(owner), adjacency))
        })
        .collect()
}

/// Credit the configured accounts and, if enabled, store the demo graphs free of charge
pub async fn seed(runtime: &RuntimeInterface, config: &ServerConfig) -> ServerResult<SeedReport> {
    let mut report = SeedReport::default();

    for account in &config.seed_accounts {
        let principal = PrincipalId::from(account.principal.as_str());
        runtime.refill(&principal, account.balance).await?;
        report.accounts += 1;
    }

    if config.seed_demo_graphs {
        for (owner, adjacency) in demo_graphs()? {
            let created = runtime.import_graph(&owner, adjacency).await?;
            report.graphs.push((owner, created));
        }
    }

    info!(
        accounts = report.accounts,
        graphs = report.graphs.len(),
        "Seed data stored"
    );
    Ok(report)
}

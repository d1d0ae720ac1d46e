//! Metric names emitted by the Waypath core, and their export.

use ::metrics::{describe_counter, describe_histogram, Unit};
use std::net::SocketAddr;

/// Tokens taken from accounts, per debit
pub const TOKENS_DEBITED: &str = "waypath_tokens_debited";
/// Tokens added to accounts, per credit
pub const TOKENS_CREDITED: &str = "waypath_tokens_credited";
/// Debits refused for lack of balance
pub const DEBITS_REJECTED: &str = "waypath_debits_rejected_total";
/// Graphs stored through paid creation
pub const GRAPHS_CREATED: &str = "waypath_graphs_created_total";
/// Successful paid path searches
pub const PATH_EXECUTIONS: &str = "waypath_path_executions_total";
/// Wall-clock duration of path searches
pub const PATH_DURATION: &str = "waypath_path_duration_seconds";
/// Proposals blended in without review
pub const PROPOSALS_AUTO_APPLIED: &str = "waypath_proposals_auto_applied_total";
/// Proposals stored for review
pub const PROPOSALS_QUEUED: &str = "waypath_proposals_queued_total";
/// Requests approved by an arbiter
pub const DECISIONS_APPROVED: &str = "waypath_decisions_approved_total";
/// Requests rejected by an arbiter
pub const DECISIONS_REJECTED: &str = "waypath_decisions_rejected_total";

/// Every metric name, in registration order
pub const ALL: [&str; 10] = [
    TOKENS_DEBITED,
    TOKENS_CREDITED,
    DEBITS_REJECTED,
    GRAPHS_CREATED,
    PATH_EXECUTIONS,
    PATH_DURATION,
    PROPOSALS_AUTO_APPLIED,
    PROPOSALS_QUEUED,
    DECISIONS_APPROVED,
    DECISIONS_REJECTED,
];

/// Register descriptions with whatever recorder is installed
pub fn describe_metrics() {
    describe_histogram!(TOKENS_DEBITED, "Tokens debited per operation");
    describe_histogram!(TOKENS_CREDITED, "Tokens credited per operation");
    describe_counter!(DEBITS_REJECTED, "Debits refused for insufficient balance");
    describe_counter!(GRAPHS_CREATED, "Graphs created and paid for");
    describe_counter!(PATH_EXECUTIONS, "Paid shortest-path executions");
    describe_histogram!(PATH_DURATION, Unit::Seconds, "Shortest-path search duration");
    describe_counter!(PROPOSALS_AUTO_APPLIED, "Weight proposals applied without review");
    describe_counter!(PROPOSALS_QUEUED, "Weight proposals queued for review");
    describe_counter!(DECISIONS_APPROVED, "Queued weight updates approved");
    describe_counter!(DECISIONS_REJECTED, "Queued weight updates rejected");
}

/// Install the Prometheus exporter with a scrape endpoint on `addr`
#[cfg(feature = "prometheus")]
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    use anyhow::Context;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Without the `prometheus` feature metrics stay unrecorded
#[cfg(not(feature = "prometheus"))]
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    tracing::warn!(%addr, "Metrics listen address set but the prometheus feature is disabled");
    Ok(())
}

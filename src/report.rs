//! Fault reporting — surface per-interaction failures without aborting
//!
//! Timeouts and handler faults are isolated to their own interaction and
//! reported asynchronously through a `FaultReporter`. The dispatch engine
//! never lets either crash the process or affect other in-flight
//! interactions.

use crate::error::Result;
use crate::types::TargetIdentity;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Why a dispatch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Deadline elapsed while the interaction was still pending
    AcknowledgementTimeout,
    /// Uncaught fault inside the application handler
    HandlerFault,
}

/// A failed dispatch with context about what went wrong
#[derive(Debug, Clone)]
pub struct FaultReport {
    /// Interaction the fault belongs to
    pub interaction_id: String,

    /// Identity the interaction resolved to
    pub identity: TargetIdentity,

    /// Category of failure
    pub kind: FaultKind,

    /// Human-readable failure detail
    pub detail: String,

    /// Unix timestamp in milliseconds when the fault was reported
    pub reported_at: u64,
}

impl FaultReport {
    /// Create a new fault report stamped with the current time
    pub fn new(
        interaction_id: impl Into<String>,
        identity: TargetIdentity,
        kind: FaultKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            identity,
            kind,
            detail: detail.into(),
            reported_at: now_millis(),
        }
    }
}

/// Trait for fault reporting channels
///
/// Implementations decide what to do with failed dispatches — log, store,
/// forward to an alerting system. Reporting failures are swallowed by the
/// dispatcher; a broken reporter must not take dispatch down with it.
#[async_trait]
pub trait FaultReporter: Send + Sync {
    /// Handle one fault report
    async fn report(&self, report: FaultReport) -> Result<()>;
}

/// Log-only reporter, the default
///
/// Emits each fault as a structured tracing event and drops it.
#[derive(Default)]
pub struct TracingReporter;

#[async_trait]
impl FaultReporter for TracingReporter {
    async fn report(&self, report: FaultReport) -> Result<()> {
        tracing::error!(
            interaction_id = %report.interaction_id,
            identity = %report.identity,
            kind = ?report.kind,
            detail = %report.detail,
            "Interaction dispatch failed"
        );
        Ok(())
    }
}

/// In-memory reporter for development and testing
///
/// Stores reports in a `Vec` with configurable max capacity.
pub struct MemoryReporter {
    reports: Arc<RwLock<Vec<FaultReport>>>,
    max_reports: usize,
}

impl MemoryReporter {
    /// Create a new in-memory reporter
    pub fn new(max_reports: usize) -> Self {
        Self {
            reports: Arc::new(RwLock::new(Vec::new())),
            max_reports,
        }
    }

    /// Number of reports received
    pub async fn count(&self) -> usize {
        self.reports.read().await.len()
    }

    /// List recent reports, most recent first
    pub async fn list(&self, limit: usize) -> Vec<FaultReport> {
        let reports = self.reports.read().await;
        reports.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for MemoryReporter {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl FaultReporter for MemoryReporter {
    async fn report(&self, report: FaultReport) -> Result<()> {
        tracing::warn!(
            interaction_id = %report.interaction_id,
            kind = ?report.kind,
            detail = %report.detail,
            "Interaction dispatch failed"
        );

        let mut reports = self.reports.write().await;
        reports.push(report);

        // Enforce max capacity
        if self.max_reports > 0 && reports.len() > self.max_reports {
            let drain_count = reports.len() - self.max_reports;
            reports.drain(..drain_count);
        }

        Ok(())
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_report(detail: &str) -> FaultReport {
        FaultReport::new(
            "int-1",
            TargetIdentity::Command { path: "echo".into() },
            FaultKind::HandlerFault,
            detail,
        )
    }

    #[test]
    fn test_report_creation() {
        let report = test_report("boom");
        assert_eq!(report.interaction_id, "int-1");
        assert_eq!(report.kind, FaultKind::HandlerFault);
        assert!(report.reported_at > 0);
    }

    #[tokio::test]
    async fn test_memory_reporter_count_and_list() {
        let reporter = MemoryReporter::default();
        assert_eq!(reporter.count().await, 0);

        for i in 0..5 {
            reporter.report(test_report(&format!("fault {}", i))).await.unwrap();
        }

        assert_eq!(reporter.count().await, 5);
        let recent = reporter.list(3).await;
        assert_eq!(recent.len(), 3);
        // Most recent first
        assert_eq!(recent[0].detail, "fault 4");
        assert_eq!(recent[2].detail, "fault 2");
    }

    #[tokio::test]
    async fn test_memory_reporter_max_capacity() {
        let reporter = MemoryReporter::new(3);

        for i in 0..5 {
            reporter.report(test_report(&format!("fault {}", i))).await.unwrap();
        }

        assert_eq!(reporter.count().await, 3);
        let recent = reporter.list(10).await;
        // Oldest reports drained
        assert_eq!(recent[2].detail, "fault 2");
    }

    #[tokio::test]
    async fn test_tracing_reporter_accepts() {
        let reporter = TracingReporter;
        assert!(reporter.report(test_report("boom")).await.is_ok());
    }
}

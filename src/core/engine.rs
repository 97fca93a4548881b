use crate::core::cancel::CancelToken;
use crate::core::report::orphan_certificates;
use crate::domain::ports::Pipeline;
use crate::domain::report::ReportSummary;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;
use std::time::Duration;

/// 一次完整執行的結果摘要
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outputs: Vec<String>,
    pub report: ReportSummary,
    pub promise_documents: usize,
    pub certificate_documents: usize,
    pub failures: usize,
    pub collisions: usize,
    pub orphan_certificates: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// 已取消，沒有寫出任何報表
    Cancelled,
}

pub struct ReconcileEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> ReconcileEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self, cancel: &CancelToken) -> Result<RunOutcome> {
        tracing::info!("🚀 Starting reconciliation");

        tracing::info!("📥 Extracting documents...");
        let Some(extraction) = self.pipeline.extract(cancel).await? else {
            tracing::warn!("🛑 Run cancelled during extraction, no report written");
            return Ok(RunOutcome::Cancelled);
        };
        self.monitor.log_phase("extract");

        if cancel.is_cancelled() {
            tracing::warn!("🛑 Run cancelled after extraction, no report written");
            return Ok(RunOutcome::Cancelled);
        }

        let report = self.pipeline.transform(&extraction).await?;
        self.monitor.log_phase("transform");

        let orphans = orphan_certificates(&extraction.promises.index, &extraction.certificates.index);
        if !orphans.is_empty() {
            tracing::warn!(
                "⚠️ {} certificates have no matching promise and are left out of the report",
                orphans.len()
            );
            for key in &orphans {
                tracing::debug!("Orphan certificate: {}", key);
            }
        }

        if cancel.is_cancelled() {
            tracing::warn!("🛑 Run cancelled before writing, no report written");
            return Ok(RunOutcome::Cancelled);
        }

        tracing::info!("📤 Writing report...");
        let outputs = self.pipeline.load(&report).await?;
        self.monitor.log_phase("load");
        self.monitor.log_final();

        let summary = RunSummary {
            outputs,
            report: report.summary(),
            promise_documents: extraction.promises.documents,
            certificate_documents: extraction.certificates.documents,
            failures: extraction.promises.failures + extraction.certificates.failures,
            collisions: extraction.promises.collisions.len()
                + extraction.certificates.collisions.len(),
            orphan_certificates: orphans.len(),
            elapsed: self.monitor.elapsed(),
        };

        tracing::info!("🎉 Reconciliation finished in {:?}", summary.elapsed);
        Ok(RunOutcome::Completed(summary))
    }
}

// プール状況監視の具象実装

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::core::types::{CompletionRecord, PoolSummary};
use crate::core::PoolObserver;

/// コンソール出力による状況報告実装
#[derive(Debug, Default)]
pub struct ConsolePoolObserver {
    quiet: bool,
    finished: AtomicUsize,
}

impl ConsolePoolObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self {
            quiet: true,
            finished: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PoolObserver for ConsolePoolObserver {
    async fn on_started(&self, worker_count: usize) {
        if !self.quiet {
            println!("🚀 Worker pool started with {worker_count} workers");
        }
    }

    async fn on_task_finished(&self, _record: &CompletionRecord) {
        let finished = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.quiet && finished % 100 == 0 {
            println!("📊 Progress: {finished} tasks finished");
        }
    }

    async fn on_task_error(&self, label: &str, error: &str) {
        if !self.quiet {
            eprintln!("❌ Error in task {label}: {error}");
        }
    }

    async fn on_shutdown(&self, summary: &PoolSummary) {
        if !self.quiet {
            println!(
                "✅ Completed! Processed: {}, Errors: {}, Cancelled: {}",
                summary.completed, summary.failed, summary.cancelled
            );
        }
    }
}

/// 何もしない状況報告実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct NoOpPoolObserver;

impl NoOpPoolObserver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PoolObserver for NoOpPoolObserver {
    async fn on_started(&self, _worker_count: usize) {
        // 何もしない
    }

    async fn on_task_finished(&self, _record: &CompletionRecord) {
        // 何もしない
    }

    async fn on_task_error(&self, _label: &str, _error: &str) {
        // 何もしない
    }

    async fn on_shutdown(&self, _summary: &PoolSummary) {
        // 何もしない
    }
}

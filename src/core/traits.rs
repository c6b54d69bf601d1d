// ワーカープールのトレイト定義
// 全ての抽象化インターフェースを定義

use super::types::{CompletionRecord, PoolSummary};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// プール構成を抽象化するトレイト
#[automock]
pub trait PoolConfig: Send + Sync {
    /// ワーカー数を取得
    fn worker_count(&self) -> usize;

    /// 最大同時実行タスク数を取得
    fn max_concurrent_tasks(&self) -> usize;

    /// 投入キューの容量を取得
    fn queue_capacity(&self) -> usize;

    /// 完了記録のバッチサイズを取得
    fn batch_size(&self) -> usize;

    /// 進捗報告を有効にするかどうか
    fn enable_progress_reporting(&self) -> bool;
}

// PoolConfig for Box<dyn PoolConfig>
impl PoolConfig for Box<dyn PoolConfig> {
    fn worker_count(&self) -> usize {
        self.as_ref().worker_count()
    }

    fn max_concurrent_tasks(&self) -> usize {
        self.as_ref().max_concurrent_tasks()
    }

    fn queue_capacity(&self) -> usize {
        self.as_ref().queue_capacity()
    }

    fn batch_size(&self) -> usize {
        self.as_ref().batch_size()
    }

    fn enable_progress_reporting(&self) -> bool {
        self.as_ref().enable_progress_reporting()
    }
}

/// プール状況監視の抽象化トレイト
#[automock]
#[async_trait]
pub trait PoolObserver: Send + Sync {
    /// プール開始時の報告
    async fn on_started(&self, worker_count: usize);

    /// タスク1件完了時の報告
    async fn on_task_finished(&self, record: &CompletionRecord);

    /// タスク失敗時の報告
    async fn on_task_error(&self, label: &str, error: &str);

    /// プール停止完了時の報告
    async fn on_shutdown(&self, summary: &PoolSummary);
}

// PoolObserver for Box<dyn PoolObserver>
#[async_trait]
impl PoolObserver for Box<dyn PoolObserver> {
    async fn on_started(&self, worker_count: usize) {
        self.as_ref().on_started(worker_count).await
    }

    async fn on_task_finished(&self, record: &CompletionRecord) {
        self.as_ref().on_task_finished(record).await
    }

    async fn on_task_error(&self, label: &str, error: &str) {
        self.as_ref().on_task_error(label, error).await
    }

    async fn on_shutdown(&self, summary: &PoolSummary) {
        self.as_ref().on_shutdown(summary).await
    }
}

/// 完了記録の永続化抽象化トレイト
#[automock]
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// バッチでの記録保存
    async fn store_batch(&self, records: &[CompletionRecord]) -> Result<()>;

    /// 実行情報の設定
    async fn set_run_info(&self, info: serde_json::Value) -> Result<()>;

    /// 保存処理の完了
    async fn finalize(&self) -> Result<()>;
}

// ResultSink for Box<dyn ResultSink>
#[async_trait]
impl ResultSink for Box<dyn ResultSink> {
    async fn store_batch(&self, records: &[CompletionRecord]) -> Result<()> {
        self.as_ref().store_batch(records).await
    }

    async fn set_run_info(&self, info: serde_json::Value) -> Result<()> {
        self.as_ref().set_run_info(info).await
    }

    async fn finalize(&self) -> Result<()> {
        self.as_ref().finalize().await
    }
}

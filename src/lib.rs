pub mod core;
pub mod engine;
pub mod services;
pub mod sync;
pub mod task;

pub use crate::core::{
    CompletionRecord, PoolConfig, PoolError, PoolMetrics, PoolObserver, PoolResult, PoolSummary,
    ResultSink, TaskError, TaskId, TaskMetadata, TaskStatus,
};
pub use crate::engine::{PoolHandle, WorkerPool};
pub use crate::services::{
    ConsolePoolObserver, DefaultPoolConfig, JsonlResultSink, MemoryResultSink, NoOpPoolObserver,
};
pub use crate::task::{CancelFlag, TaskHandle};

// プール組み立ての役割を果たすジェネリックなビルダー構造体
// 依存関係を直接所有し、buildでWorkerPoolへ注入する設計
pub struct PoolBuilder<C, O, S>
where
    C: PoolConfig,
    O: PoolObserver + 'static,
    S: ResultSink + 'static,
{
    config: C,
    observer: O,
    sink: S,
}

impl PoolBuilder<DefaultPoolConfig, ConsolePoolObserver, MemoryResultSink> {
    /// デフォルト構成のビルダーを作成
    pub fn new() -> Self {
        Self {
            config: DefaultPoolConfig::default(),
            observer: ConsolePoolObserver::new(),
            sink: MemoryResultSink::new(),
        }
    }
}

impl PoolBuilder<DefaultPoolConfig, NoOpPoolObserver, MemoryResultSink> {
    /// 静音版のビルダーを作成（バックグラウンド処理・テスト用）
    pub fn quiet() -> Self {
        Self {
            config: DefaultPoolConfig::default(),
            observer: NoOpPoolObserver::new(),
            sink: MemoryResultSink::new(),
        }
    }
}

impl Default for PoolBuilder<DefaultPoolConfig, ConsolePoolObserver, MemoryResultSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, O, S> PoolBuilder<C, O, S>
where
    C: PoolConfig,
    O: PoolObserver + 'static,
    S: ResultSink + 'static,
{
    /// 構成を差し替える
    pub fn with_config<C2: PoolConfig>(self, config: C2) -> PoolBuilder<C2, O, S> {
        PoolBuilder {
            config,
            observer: self.observer,
            sink: self.sink,
        }
    }

    /// 監視実装を差し替える
    pub fn with_observer<O2: PoolObserver + 'static>(self, observer: O2) -> PoolBuilder<C, O2, S> {
        PoolBuilder {
            config: self.config,
            observer,
            sink: self.sink,
        }
    }

    /// 永続化実装を差し替える
    pub fn with_sink<S2: ResultSink + 'static>(self, sink: S2) -> PoolBuilder<C, O, S2> {
        PoolBuilder {
            config: self.config,
            observer: self.observer,
            sink,
        }
    }

    /// プールを起動する
    pub async fn build<T: Send + 'static>(self) -> PoolResult<WorkerPool<T, C, O, S>> {
        WorkerPool::start(self.config, self.observer, self.sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_with_defaults() {
        let pool: WorkerPool<u64, _, _, _> = PoolBuilder::new().build().await.unwrap();

        assert_eq!(
            pool.config().worker_count(),
            num_cpus::get().max(1) * 2
        );
        assert!(pool.config().enable_progress_reporting());

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_quiet_builder_runs_tasks() {
        let pool: WorkerPool<u64, _, _, _> = PoolBuilder::quiet()
            .with_config(DefaultPoolConfig::default().with_worker_count(2))
            .build()
            .await
            .unwrap();

        let handle = pool.handle().submit("double", async { Ok(21 * 2) }).await.unwrap();
        assert_eq!(handle.await.unwrap(), 42);

        let summary = pool.shutdown().await.unwrap();
        assert_eq!(summary.completed, 1);
    }

    #[tokio::test]
    async fn test_builder_with_custom_components() {
        let sink = MemoryResultSink::new();
        let config = DefaultPoolConfig::default()
            .with_worker_count(4)
            .with_batch_size(10);

        let pool: WorkerPool<u64, _, _, _> = PoolBuilder::quiet()
            .with_config(config)
            .with_sink(sink.clone())
            .build()
            .await
            .unwrap();

        // カスタム設定が反映されることを確認
        assert_eq!(pool.config().worker_count(), 4);
        assert_eq!(pool.config().batch_size(), 10);

        let handle = pool.handle().submit("persisted", async { Ok(1) }).await.unwrap();
        handle.await.unwrap();
        pool.shutdown().await.unwrap();

        // 注入したシンクに記録が残る
        assert!(sink.contains_label("persisted"));
        assert!(sink.is_finalized());
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let result = PoolBuilder::quiet()
            .with_config(DefaultPoolConfig::default().with_batch_size(0))
            .build::<u64>()
            .await;

        assert!(matches!(result, Err(PoolError::ConfigurationError { .. })));
    }
}

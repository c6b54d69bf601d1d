// WorkerPool - 完全依存性注入によるタスク実行エンジン
// 構成・監視・永続化をコンストラクタで注入するDIパターン実装

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex, Semaphore};

use super::worker::spawn_workers;
use crate::core::{
    CompletionRecord, PoolConfig, PoolError, PoolMetrics, PoolObserver, PoolResult, PoolState,
    PoolSummary, ResultSink, TaskError, TaskMetadata, TaskStatus,
};
use crate::services::persistence::spawn_result_collector;
use crate::sync::{CountdownLatch, ShutdownController};
use crate::task::{Task, TaskHandle};

/// タスク投入側のハンドル
///
/// クローン可能で、複数の投入元から同じプールへタスクを送れる。
/// プール停止後の投入はPoolClosedで失敗する。
pub struct PoolHandle<T> {
    work_tx: mpsc::Sender<Task<T>>,
    state: Arc<PoolState>,
}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        Self {
            work_tx: self.work_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Send + 'static> PoolHandle<T> {
    /// タスクを投入する
    ///
    /// キューが満杯の場合は空きが出るまで待機する。
    pub async fn submit<F>(&self, label: impl Into<String>, future: F) -> PoolResult<TaskHandle<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let label = label.into();
        if self.state.is_closed() {
            return Err(PoolError::pool_closed(label));
        }

        let (task, handle) = Task::new(self.state.next_id(), label, future);
        match self.work_tx.send(task).await {
            Ok(()) => {
                self.state.record_submitted();
                Ok(handle)
            }
            Err(send_error) => Err(PoolError::pool_closed(send_error.0.label)),
        }
    }

    /// タスクを投入する（非ブロッキング版）
    ///
    /// キューが満杯の場合は待機せずQueueFullで失敗する。
    pub fn try_submit<F>(&self, label: impl Into<String>, future: F) -> PoolResult<TaskHandle<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let label = label.into();
        if self.state.is_closed() {
            return Err(PoolError::pool_closed(label));
        }

        let (task, handle) = Task::new(self.state.next_id(), label, future);
        match self.work_tx.try_send(task) {
            Ok(()) => {
                self.state.record_submitted();
                Ok(handle)
            }
            Err(mpsc::error::TrySendError::Full(task)) => Err(PoolError::queue_full(task.label)),
            Err(mpsc::error::TrySendError::Closed(task)) => {
                Err(PoolError::pool_closed(task.label))
            }
        }
    }

    /// 現在のカウンタのスナップショットを取得
    pub fn metrics(&self) -> PoolMetrics {
        self.state.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// 完全依存性注入によるワーカープール
///
/// 構成・監視・永続化の依存関係をコンストラクタで注入する。
/// 並列処理で共有される依存関係はArcで管理する。
pub struct WorkerPool<T, C, O, S>
where
    T: Send + 'static,
    C: PoolConfig,
    O: PoolObserver + 'static,
    S: ResultSink + 'static,
{
    config: Arc<C>,
    observer: Arc<O>,
    sink: Arc<S>,
    state: Arc<PoolState>,
    handle: PoolHandle<T>,
    work_rx: Arc<Mutex<mpsc::Receiver<Task<T>>>>,
    record_tx: mpsc::Sender<CompletionRecord>,
    worker_handles: Vec<tokio::task::JoinHandle<Result<()>>>,
    collector_handle: tokio::task::JoinHandle<Result<()>>,
    shutdown: ShutdownController,
    worker_latch: Arc<CountdownLatch>,
    started_at: Instant,
}

impl<T, C, O, S> WorkerPool<T, C, O, S>
where
    T: Send + 'static,
    C: PoolConfig,
    O: PoolObserver + 'static,
    S: ResultSink + 'static,
{
    /// プールを起動する
    ///
    /// 設定検証の後、ワーカー群とコレクタを起動し、
    /// 実行情報をシンクへ書き出す。
    pub async fn start(config: C, observer: O, sink: S) -> PoolResult<Self> {
        Self::validate(&config)?;

        let config = Arc::new(config);
        let observer = Arc::new(observer);
        let sink = Arc::new(sink);
        let state = Arc::new(PoolState::new());

        // 投入キューと完了記録のチャンネル構築
        let (work_tx, work_rx) = mpsc::channel::<Task<T>>(config.queue_capacity());
        let (record_tx, record_rx) = mpsc::channel::<CompletionRecord>(config.queue_capacity());
        let work_rx = Arc::new(Mutex::new(work_rx));

        // 同期プリミティブ
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks()));
        let (shutdown, signal) = ShutdownController::new();
        let worker_latch = Arc::new(CountdownLatch::new(config.worker_count()));

        // Worker Pool起動
        let worker_handles = spawn_workers(
            Arc::clone(&work_rx),
            record_tx.clone(),
            semaphore,
            signal,
            Arc::clone(&worker_latch),
            config.worker_count(),
        );

        // Result Collector起動
        let collector_handle = spawn_result_collector(
            record_rx,
            Arc::clone(&state),
            Arc::clone(&observer),
            Arc::clone(&sink),
            config.batch_size(),
            config.enable_progress_reporting(),
        );

        // 実行情報を永続化
        let run_info = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "settings": {
                "worker_count": config.worker_count(),
                "max_concurrent": config.max_concurrent_tasks(),
                "queue_capacity": config.queue_capacity(),
                "batch_size": config.batch_size(),
            }
        });
        sink.set_run_info(run_info)
            .await
            .map_err(PoolError::persistence)?;

        observer.on_started(config.worker_count()).await;

        let handle = PoolHandle {
            work_tx,
            state: Arc::clone(&state),
        };

        Ok(Self {
            config,
            observer,
            sink,
            state,
            handle,
            work_rx,
            record_tx,
            worker_handles,
            collector_handle,
            shutdown,
            worker_latch,
            started_at: Instant::now(),
        })
    }

    fn validate(config: &C) -> PoolResult<()> {
        if config.worker_count() == 0 {
            return Err(PoolError::configuration(
                "ワーカー数は1以上である必要があります",
            ));
        }
        if config.max_concurrent_tasks() == 0 {
            return Err(PoolError::configuration(
                "最大同時実行数は1以上である必要があります",
            ));
        }
        if config.queue_capacity() == 0 {
            return Err(PoolError::configuration(
                "キュー容量は1以上である必要があります",
            ));
        }
        if config.batch_size() == 0 {
            return Err(PoolError::configuration(
                "バッチサイズは1以上である必要があります",
            ));
        }
        Ok(())
    }

    /// 投入ハンドルを取得
    pub fn handle(&self) -> PoolHandle<T> {
        self.handle.clone()
    }

    /// 設定への参照を取得（読み取り専用アクセス）
    pub fn config(&self) -> &C {
        &self.config
    }

    /// 現在のカウンタのスナップショットを取得
    pub fn metrics(&self) -> PoolMetrics {
        self.state.snapshot()
    }

    /// 段階的停止
    ///
    /// 新規投入を締め切り、キュー内の残タスクを全て実行してから
    /// 停止する。全タスクの完了記録が確定した後のサマリーを返す。
    pub async fn shutdown(self) -> PoolResult<PoolSummary> {
        let Self {
            config: _,
            observer,
            sink,
            state,
            handle,
            work_rx: _,
            record_tx,
            worker_handles,
            collector_handle,
            shutdown,
            worker_latch,
            started_at,
        } = self;

        state.close();
        shutdown.close();
        drop(handle); // プール保持分の送信側を解放

        // 全ワーカーの終了を待機
        worker_latch.wait().await;
        join_workers(worker_handles).await?;

        finish(
            record_tx,
            collector_handle,
            observer,
            sink,
            &state,
            started_at,
        )
        .await
    }

    /// 即時停止
    ///
    /// 実行中のタスクを中断し、キュー内の残タスクをキャンセル扱いで
    /// 破棄して停止する。
    pub async fn shutdown_now(self) -> PoolResult<PoolSummary> {
        let Self {
            config: _,
            observer,
            sink,
            state,
            handle,
            work_rx,
            record_tx,
            worker_handles,
            collector_handle,
            shutdown,
            worker_latch,
            started_at,
        } = self;

        state.close();
        shutdown.abort();
        drop(handle);

        worker_latch.wait().await;
        join_workers(worker_handles).await?;

        // ワーカー停止後に残ったキューをキャンセル扱いで排出
        {
            let mut rx = work_rx.lock().await;
            while let Ok(task) = rx.try_recv() {
                let record = cancel_queued_task(task);
                record_tx
                    .send(record)
                    .await
                    .map_err(|_| PoolError::channel("完了記録チャンネルが閉じられています"))?;
            }
        }

        finish(
            record_tx,
            collector_handle,
            observer,
            sink,
            &state,
            started_at,
        )
        .await
    }

    /// タスク一式を実行して停止する（バッチ実行の高レベルAPI)
    ///
    /// 全ハンドルの結果とサマリーを返す。
    pub async fn run_batch<F>(
        self,
        tasks: Vec<(String, F)>,
    ) -> PoolResult<(Vec<Result<T, TaskError>>, PoolSummary)>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let submitter = self.handle();

        let mut handles = Vec::with_capacity(tasks.len());
        for (label, future) in tasks {
            handles.push(submitter.submit(label, future).await?);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await);
        }

        let summary = self.shutdown().await?;
        Ok((results, summary))
    }
}

async fn join_workers(handles: Vec<tokio::task::JoinHandle<Result<()>>>) -> PoolResult<()> {
    for handle in handles {
        handle
            .await
            .map_err(PoolError::task_join)?
            .map_err(PoolError::worker)?;
    }
    Ok(())
}

/// 停止処理の共通末尾: コレクタ終了、シンク確定、サマリー報告
async fn finish<O, S>(
    record_tx: mpsc::Sender<CompletionRecord>,
    collector_handle: tokio::task::JoinHandle<Result<()>>,
    observer: Arc<O>,
    sink: Arc<S>,
    state: &PoolState,
    started_at: Instant,
) -> PoolResult<PoolSummary>
where
    O: PoolObserver + 'static,
    S: ResultSink + 'static,
{
    // record_txを閉じてコレクタに完了を通知
    drop(record_tx);
    collector_handle
        .await
        .map_err(PoolError::task_join)?
        .map_err(PoolError::worker)?;

    sink.finalize().await.map_err(PoolError::persistence)?;

    let summary = build_summary(state, started_at);
    observer.on_shutdown(&summary).await;
    Ok(summary)
}

fn build_summary(state: &PoolState, started_at: Instant) -> PoolSummary {
    let metrics = state.snapshot();
    let total_time_ms = started_at.elapsed().as_millis() as u64;
    let finished = metrics.completed + metrics.failed + metrics.cancelled;
    let average_task_time_ms = if finished > 0 {
        total_time_ms as f64 / finished as f64
    } else {
        0.0
    };

    PoolSummary {
        submitted: metrics.submitted,
        completed: metrics.completed,
        failed: metrics.failed,
        cancelled: metrics.cancelled,
        total_time_ms,
        average_task_time_ms,
    }
}

/// キュー内で破棄されるタスクのハンドル解決と記録作成
fn cancel_queued_task<T>(task: Task<T>) -> CompletionRecord {
    let Task {
        id,
        label,
        future: _,
        cancel: _,
        result_tx,
        submitted_at,
    } = task;

    let _ = result_tx.send(Err(TaskError::cancelled(&label)));
    CompletionRecord {
        id,
        label,
        status: TaskStatus::Cancelled,
        error: None,
        metadata: TaskMetadata {
            queue_wait_ms: submitted_at.elapsed().as_millis() as u64,
            run_time_ms: 0,
            worker_id: None,
            finished_at: chrono::Utc::now(),
        },
    }
}

// Collector - 完了記録の収集と永続化機能

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::core::types::{CompletionRecord, TaskStatus};
use crate::core::{PoolObserver, PoolState, ResultSink};

/// Collector: 完了記録の収集と永続化
///
/// カウンタ更新、監視通知、シンクへのバッチ保存を一手に担う。
/// 記録チャンネルが閉じられると残りバッチを書き出して終了する。
pub fn spawn_result_collector<O, S>(
    mut record_rx: mpsc::Receiver<CompletionRecord>,
    state: Arc<PoolState>,
    observer: Arc<O>,
    sink: Arc<S>,
    batch_size: usize,
    report_progress: bool,
) -> tokio::task::JoinHandle<Result<()>>
where
    O: PoolObserver + 'static,
    S: ResultSink + 'static,
{
    tokio::spawn(async move {
        let mut batch = Vec::with_capacity(batch_size);

        while let Some(record) = record_rx.recv().await {
            // カウンタ更新（パニックは失敗として数える）
            match record.status {
                TaskStatus::Completed => state.record_completed(),
                TaskStatus::Failed | TaskStatus::Panicked => state.record_failed(),
                TaskStatus::Cancelled => state.record_cancelled(),
            }

            if let Some(error) = &record.error {
                observer.on_task_error(&record.label, error).await;
            }
            if report_progress {
                observer.on_task_finished(&record).await;
            }

            batch.push(record);

            // バッチ永続化
            if batch.len() >= batch_size {
                sink.store_batch(&batch).await?;
                batch.clear();
            }
        }

        // 残りバッチの永続化
        if !batch.is_empty() {
            sink.store_batch(&batch).await?;
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MockPoolObserver;
    use crate::core::types::{TaskId, TaskMetadata};
    use crate::services::monitoring::NoOpPoolObserver;
    use crate::services::persistence::MemoryResultSink;

    fn record_with_status(index: u64, status: TaskStatus) -> CompletionRecord {
        let error = match status {
            TaskStatus::Failed => Some("実行エラー".to_string()),
            TaskStatus::Panicked => Some("パニック".to_string()),
            _ => None,
        };
        CompletionRecord {
            id: TaskId(index),
            label: format!("task{index}"),
            status,
            error,
            metadata: TaskMetadata {
                queue_wait_ms: 0,
                run_time_ms: 1,
                worker_id: Some(0),
                finished_at: chrono::Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_collector_updates_counters_by_status() {
        let (record_tx, record_rx) = mpsc::channel(10);
        let state = Arc::new(PoolState::new());
        let sink = MemoryResultSink::new();

        let collector = spawn_result_collector(
            record_rx,
            Arc::clone(&state),
            Arc::new(NoOpPoolObserver::new()),
            Arc::new(sink.clone()),
            2,
            true,
        );

        record_tx
            .send(record_with_status(1, TaskStatus::Completed))
            .await
            .unwrap();
        record_tx
            .send(record_with_status(2, TaskStatus::Failed))
            .await
            .unwrap();
        record_tx
            .send(record_with_status(3, TaskStatus::Panicked))
            .await
            .unwrap();
        record_tx
            .send(record_with_status(4, TaskStatus::Cancelled))
            .await
            .unwrap();

        drop(record_tx); // チャンネル終了

        collector.await.unwrap().unwrap();

        let metrics = state.snapshot();
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.failed, 2); // FailedとPanickedの両方
        assert_eq!(metrics.cancelled, 1);
    }

    #[tokio::test]
    async fn test_collector_flushes_partial_batch() {
        let (record_tx, record_rx) = mpsc::channel(10);
        let sink = MemoryResultSink::new();

        let collector = spawn_result_collector(
            record_rx,
            Arc::new(PoolState::new()),
            Arc::new(NoOpPoolObserver::new()),
            Arc::new(sink.clone()),
            10, // バッチサイズより少ない記録数
            true,
        );

        for index in 0..3 {
            record_tx
                .send(record_with_status(index, TaskStatus::Completed))
                .await
                .unwrap();
        }
        drop(record_tx);

        collector.await.unwrap().unwrap();

        // 端数バッチも書き出される
        assert_eq!(sink.stored_count(), 3);
    }

    #[tokio::test]
    async fn test_collector_batches_at_boundary() {
        let (record_tx, record_rx) = mpsc::channel(10);
        let sink = MemoryResultSink::new();

        let collector = spawn_result_collector(
            record_rx,
            Arc::new(PoolState::new()),
            Arc::new(NoOpPoolObserver::new()),
            Arc::new(sink.clone()),
            2,
            true,
        );

        for index in 0..4 {
            record_tx
                .send(record_with_status(index, TaskStatus::Completed))
                .await
                .unwrap();
        }
        drop(record_tx);

        collector.await.unwrap().unwrap();
        assert_eq!(sink.stored_count(), 4);
    }

    #[tokio::test]
    async fn test_collector_notifies_observer_of_errors() {
        let (record_tx, record_rx) = mpsc::channel(10);

        let mut observer = MockPoolObserver::new();
        observer
            .expect_on_task_error()
            .withf(|label, error| label == "task1" && error.contains("実行エラー"))
            .times(1)
            .return_const(());
        // 進捗報告は無効でもエラー通知は届く
        observer.expect_on_task_finished().times(0).return_const(());

        let collector = spawn_result_collector(
            record_rx,
            Arc::new(PoolState::new()),
            Arc::new(observer),
            Arc::new(MemoryResultSink::new()),
            10,
            false,
        );

        record_tx
            .send(record_with_status(1, TaskStatus::Failed))
            .await
            .unwrap();
        drop(record_tx);

        collector.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_collector_with_no_records() {
        let (record_tx, record_rx) = mpsc::channel::<CompletionRecord>(1);
        let sink = MemoryResultSink::new();

        let collector = spawn_result_collector(
            record_rx,
            Arc::new(PoolState::new()),
            Arc::new(NoOpPoolObserver::new()),
            Arc::new(sink.clone()),
            5,
            true,
        );

        drop(record_tx);

        collector.await.unwrap().unwrap();
        assert_eq!(sink.stored_count(), 0);
    }
}

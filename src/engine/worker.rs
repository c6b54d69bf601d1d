// Worker - 並列ワーカー機能

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::core::types::{CompletionRecord, TaskMetadata, TaskStatus};
use crate::core::TaskError;
use crate::sync::{CountdownLatch, ShutdownSignal};
use crate::task::Task;

/// 単一ワーカー
///
/// 共有キューからタスクを取り出し、セマフォで同時実行数を
/// 制御しながら実行する。終了時にラッチをカウントダウンする。
pub fn spawn_single_worker<T>(
    worker_id: usize,
    work_rx: Arc<Mutex<mpsc::Receiver<Task<T>>>>,
    record_tx: mpsc::Sender<CompletionRecord>,
    semaphore: Arc<Semaphore>,
    shutdown: ShutdownSignal,
    latch: Arc<CountdownLatch>,
) -> tokio::task::JoinHandle<Result<()>>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        let result = worker_loop(worker_id, work_rx, record_tx, semaphore, shutdown).await;
        latch.count_down();
        result
    })
}

/// Workers: 固定数のワーカープール
pub fn spawn_workers<T>(
    work_rx: Arc<Mutex<mpsc::Receiver<Task<T>>>>,
    record_tx: mpsc::Sender<CompletionRecord>,
    semaphore: Arc<Semaphore>,
    shutdown: ShutdownSignal,
    latch: Arc<CountdownLatch>,
    worker_count: usize,
) -> Vec<tokio::task::JoinHandle<Result<()>>>
where
    T: Send + 'static,
{
    let mut handles = Vec::new();

    for worker_id in 0..worker_count {
        let handle = spawn_single_worker(
            worker_id,
            Arc::clone(&work_rx),
            record_tx.clone(),
            Arc::clone(&semaphore),
            shutdown.clone(),
            Arc::clone(&latch),
        );
        handles.push(handle);
    }

    handles
}

async fn worker_loop<T>(
    worker_id: usize,
    work_rx: Arc<Mutex<mpsc::Receiver<Task<T>>>>,
    record_tx: mpsc::Sender<CompletionRecord>,
    semaphore: Arc<Semaphore>,
    shutdown: ShutdownSignal,
) -> Result<()>
where
    T: Send + 'static,
{
    loop {
        // 次のタスクを取得。停止フェーズを監視しながら受信する
        let task = {
            let mut rx = work_rx.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.aborted() => None,
                // Closing後はキューを空にするまで取り出し、空になったら終了
                _ = shutdown.closing() => rx.try_recv().ok(),
                task = rx.recv() => task,
            }
        };

        let Some(task) = task else {
            break; // チャンネル終了または停止シグナル
        };

        // セマフォで同時実行数制御。待機中のAbortは保持タスクの破棄を意味する
        let permit = tokio::select! {
            biased;
            _ = shutdown.aborted() => None,
            permit = semaphore.acquire() => {
                Some(permit.map_err(|e| anyhow::anyhow!("セマフォエラー: {e}"))?)
            }
        };

        let record = match permit {
            Some(_permit) => process_one(worker_id, task, &shutdown).await,
            None => abandon_one(worker_id, task),
        };

        // 結果チャンネルが閉じられた場合は終了
        if record_tx.send(record).await.is_err() {
            break;
        }
    }
    Ok(())
}

/// タスク1件を実行し、ハンドルへ結果を届けて完了記録を返す
async fn process_one<T>(worker_id: usize, task: Task<T>, shutdown: &ShutdownSignal) -> CompletionRecord
where
    T: Send + 'static,
{
    let Task {
        id,
        label,
        future,
        cancel,
        result_tx,
        submitted_at,
    } = task;
    let queue_wait_ms = submitted_at.elapsed().as_millis() as u64;

    // 投入後にキャンセル済みのタスクは実行しない
    if cancel.is_cancelled() {
        let _ = result_tx.send(Err(TaskError::cancelled(&label)));
        return CompletionRecord {
            id,
            label,
            status: TaskStatus::Cancelled,
            error: None,
            metadata: TaskMetadata {
                queue_wait_ms,
                run_time_ms: 0,
                worker_id: Some(worker_id),
                finished_at: chrono::Utc::now(),
            },
        };
    }

    let started = Instant::now();

    // タスクごとにspawnしてパニックをJoinErrorとして隔離する
    let mut join = tokio::spawn(future);
    let outcome: Result<T, TaskError> = tokio::select! {
        biased;
        _ = shutdown.aborted() => {
            join.abort();
            let _ = (&mut join).await;
            Err(TaskError::cancelled(&label))
        }
        _ = cancel.cancelled() => {
            join.abort();
            let _ = (&mut join).await;
            Err(TaskError::cancelled(&label))
        }
        joined = &mut join => match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(TaskError::failed(&label, error)),
            Err(join_error) if join_error.is_panic() => {
                Err(TaskError::panicked(&label, panic_message(join_error)))
            }
            Err(_) => Err(TaskError::cancelled(&label)),
        },
    };
    let run_time_ms = started.elapsed().as_millis() as u64;

    let (status, error) = match &outcome {
        Ok(_) => (TaskStatus::Completed, None),
        Err(TaskError::Cancelled { .. }) => (TaskStatus::Cancelled, None),
        Err(TaskError::Panicked { message, .. }) => {
            (TaskStatus::Panicked, Some(message.clone()))
        }
        Err(task_error) => (TaskStatus::Failed, Some(task_error.to_string())),
    };

    // ハンドル側が既に破棄されていても記録は残す
    let _ = result_tx.send(outcome);

    CompletionRecord {
        id,
        label,
        status,
        error,
        metadata: TaskMetadata {
            queue_wait_ms,
            run_time_ms,
            worker_id: Some(worker_id),
            finished_at: chrono::Utc::now(),
        },
    }
}

/// セマフォ待機中にAbortされ、実行に入れなかったタスクの処理
fn abandon_one<T>(worker_id: usize, task: Task<T>) -> CompletionRecord {
    let Task {
        id,
        label,
        cancel: _,
        future: _,
        result_tx,
        submitted_at,
    } = task;
    let queue_wait_ms = submitted_at.elapsed().as_millis() as u64;

    let _ = result_tx.send(Err(TaskError::cancelled(&label)));
    CompletionRecord {
        id,
        label,
        status: TaskStatus::Cancelled,
        error: None,
        metadata: TaskMetadata {
            queue_wait_ms,
            run_time_ms: 0,
            worker_id: Some(worker_id),
            finished_at: chrono::Utc::now(),
        },
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    match join_error.try_into_panic() {
        Ok(payload) => {
            if let Some(message) = payload.downcast_ref::<&str>() {
                (*message).to_string()
            } else if let Some(message) = payload.downcast_ref::<String>() {
                message.clone()
            } else {
                "不明なパニック".to_string()
            }
        }
        Err(_) => "タスクが中断されました".to_string(),
    }
}

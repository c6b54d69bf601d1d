// タスクハンドル - 投入済みタスクの結果取得とキャンセル操作

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::cancel::CancelFlag;
use crate::core::{TaskError, TaskId};

/// 投入済みタスクへのハンドル
///
/// Futureを実装しているため直接awaitでき、async処理の中で
/// そのまま連鎖できる。プール側が結果を送らずに停止した場合は
/// TaskError::Abandonedに解決する。
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    label: String,
    cancel: CancelFlag,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(
        id: TaskId,
        label: String,
        cancel: CancelFlag,
        rx: oneshot::Receiver<Result<T, TaskError>>,
    ) -> Self {
        Self {
            id,
            label,
            cancel,
            rx,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// タスクのキャンセルを要求する
    ///
    /// キュー内のタスクは実行されずに破棄され、実行中のタスクは
    /// 中断される。既に完了したタスクには影響しない。
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            // 送信側が結果を出さずに破棄された
            Err(_) => Err(TaskError::abandoned(this.label.clone())),
        })
    }
}

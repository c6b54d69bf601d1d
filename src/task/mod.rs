// タスク層 - 投入単位の定義とハンドル・キャンセル機構

pub mod cancel;
pub mod handle;

// 公開API
pub use cancel::CancelFlag;
pub use handle::TaskHandle;

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::core::{TaskError, TaskId};

/// タスク本体のBox化されたFuture型
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// キューに投入される実行単位
///
/// 結果の送信側(oneshot)を内包し、ワーカーが実行後に
/// 対応するTaskHandleへ結果を届ける。
pub struct Task<T> {
    pub(crate) id: TaskId,
    pub(crate) label: String,
    pub(crate) future: TaskFuture<T>,
    pub(crate) cancel: CancelFlag,
    pub(crate) result_tx: oneshot::Sender<Result<T, TaskError>>,
    pub(crate) submitted_at: Instant,
}

impl<T: Send + 'static> Task<T> {
    /// タスクとハンドルのペアを作成
    pub(crate) fn new<F>(id: TaskId, label: impl Into<String>, future: F) -> (Self, TaskHandle<T>)
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let label = label.into();
        let cancel = CancelFlag::new();
        let (result_tx, result_rx) = oneshot::channel();

        let task = Self {
            id,
            label: label.clone(),
            future: Box::pin(future),
            cancel: cancel.clone(),
            result_tx,
            submitted_at: Instant::now(),
        };
        let handle = TaskHandle::new(id, label, cancel, result_rx);

        (task, handle)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

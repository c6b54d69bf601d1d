// キャンセルフラグ - watchチャンネルによる共有フラグ

use std::sync::Arc;
use tokio::sync::watch;

/// タスク単位のキャンセルフラグ
///
/// Cloneはフラグを共有する。watchチャンネルの値監視なので
/// 通知の取りこぼしは起きない（待機側は常に現在値を再確認する）。
#[derive(Debug, Clone)]
pub struct CancelFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// キャンセルを要求する。複数回呼んでも安全
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// キャンセルされるまで待機
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // 送信側が消えた場合、以後キャンセルは発生しない
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

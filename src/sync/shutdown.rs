// 停止シグナル - watchチャンネルによるブロードキャスト

use tokio::sync::watch;

/// プール停止のフェーズ
///
/// Running -> Closing -> Aborted の順でのみ遷移する。
/// Closingはキュー内の残タスクを実行し切ってから停止する段階、
/// Abortedは実行中タスクも中断して即時停止する段階。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    Running,
    Closing,
    Aborted,
}

/// 停止シグナルの送信側。プール本体が保持する
#[derive(Debug)]
pub struct ShutdownController {
    tx: watch::Sender<ShutdownPhase>,
}

/// 停止シグナルの受信側。各ワーカーがクローンを保持する
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<ShutdownPhase>,
}

impl ShutdownController {
    pub fn new() -> (Self, ShutdownSignal) {
        let (tx, rx) = watch::channel(ShutdownPhase::Running);
        (Self { tx }, ShutdownSignal { rx })
    }

    /// 段階的停止を通知。既にAbortedなら何もしない
    pub fn close(&self) {
        self.tx.send_modify(|phase| {
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::Closing;
            }
        });
    }

    /// 即時停止を通知。常に最終フェーズへ遷移する
    pub fn abort(&self) {
        self.tx.send_modify(|phase| *phase = ShutdownPhase::Aborted);
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.tx.borrow()
    }
}

impl ShutdownSignal {
    pub fn phase(&self) -> ShutdownPhase {
        *self.rx.borrow()
    }

    /// Closing以上のフェーズになるまで待機
    ///
    /// レベルトリガー: 既にClosing/Abortedなら即座に戻る。
    pub async fn closing(&self) {
        self.wait_for(ShutdownPhase::Closing).await
    }

    /// Abortedになるまで待機
    pub async fn aborted(&self) {
        self.wait_for(ShutdownPhase::Aborted).await
    }

    async fn wait_for(&self, target: ShutdownPhase) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() >= target {
                return;
            }
            if rx.changed().await.is_err() {
                // コントローラ消失はプール破棄と同義なので停止扱い
                return;
            }
        }
    }
}

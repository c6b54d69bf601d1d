// カウントダウンラッチ - グループ完了待ち合わせ

use tokio::sync::watch;

/// 一度きりのカウントダウンバリア
///
/// カウントが0に達すると全ての待機側が解放される。
/// 開放後のwaitは即座に戻る。再利用はできない。
#[derive(Debug)]
pub struct CountdownLatch {
    state: watch::Sender<usize>,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        let (state, _rx) = watch::channel(count);
        Self { state }
    }

    /// カウントを1つ減らす。0以下には下がらない
    pub fn count_down(&self) {
        self.state.send_modify(|count| *count = count.saturating_sub(1));
    }

    pub fn count(&self) -> usize {
        *self.state.borrow()
    }

    /// カウントが0になるまで待機
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        loop {
            if *rx.borrow_and_update() == 0 {
                return;
            }
            if rx.changed().await.is_err() {
                // ラッチ本体が破棄された場合は開放されない
                std::future::pending::<()>().await;
            }
        }
    }
}

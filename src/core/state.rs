// プール共有状態 - ロックフリーのカウンタ群

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::types::TaskId;

/// プール全体で共有される実行状態
///
/// カウンタは全てアトミックで、ワーカー・コレクタ・投入側から
/// ロックなしに更新される。closedのみ投入ゲートとして
/// Acquire/Releaseで扱う。
#[derive(Debug, Default)]
pub struct PoolState {
    next_id: AtomicU64,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
    closed: AtomicBool,
}

/// カウンタのスナップショット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl PoolMetrics {
    /// 投入済みでまだ完了記録のないタスク数
    pub fn pending(&self) -> usize {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.cancelled)
    }
}

impl PoolState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次のタスクIDを採番
    pub fn next_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// 投入ゲートを閉じる。初回の呼び出しのみtrueを返す
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

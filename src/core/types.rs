// タスク処理に関連するデータ型定義

use chrono::{DateTime, Utc};

/// タスク識別子
///
/// プールごとのアトミックカウンタから採番され、投入順に単調増加する。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// タスクの最終状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaskStatus {
    Completed,
    Failed,
    Cancelled,
    Panicked,
}

/// タスク実行時のメタデータ
///
/// worker_idは実際にワーカーが取り出したタスクのみSome。
/// キュー内で破棄されたタスクはNoneになる。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TaskMetadata {
    pub queue_wait_ms: u64,
    pub run_time_ms: u64,
    pub worker_id: Option<usize>,
    pub finished_at: DateTime<Utc>,
}

/// タスク1件の完了記録
///
/// 結果の値はハンドル側にのみ渡されるため、記録には含まれない。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompletionRecord {
    pub id: TaskId,
    pub label: String,
    pub status: TaskStatus,
    pub error: Option<String>,
    pub metadata: TaskMetadata,
}

/// プール全体のサマリー
///
/// 停止完了後は submitted == completed + failed + cancelled が成立する
/// （パニックしたタスクはfailedに含まれる）。
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSummary {
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_time_ms: u64,
    pub average_task_time_ms: f64,
}

// エンジン層 - ワーカープールとオーケストレーション
// 同期プリミティブとサービス層を組み合わせて高レベルな処理を提供

pub mod coordinator;
pub mod worker;

// 公開API - 主要エンジンクラス
pub use coordinator::{PoolHandle, WorkerPool};
pub use worker::{spawn_single_worker, spawn_workers};

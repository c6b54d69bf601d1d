// 同期プリミティブ層 - ワーカー間の待ち合わせと停止通知

pub mod latch;
pub mod shutdown;

// 公開API
pub use latch::CountdownLatch;
pub use shutdown::{ShutdownController, ShutdownPhase, ShutdownSignal};

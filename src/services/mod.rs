// サービス層 - 機能別のビジネスロジック
// 各サービスは特定の責任を持ち、疎結合で設計されている

pub mod config;
pub mod monitoring;
pub mod persistence;

// 公開API - 各サービスの主要機能を明示的にエクスポート
pub use config::DefaultPoolConfig;
pub use monitoring::{ConsolePoolObserver, NoOpPoolObserver};
pub use persistence::{spawn_result_collector, JsonlResultSink, MemoryResultSink};

// Custom error types for the worker pool
// ワーカープール専用のカスタムエラー型定義

use thiserror::Error;

/// プール操作固有のエラー型
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("設定エラー: {message}")]
    ConfigurationError { message: String },

    #[error("キュー満杯エラー: {label}")]
    QueueFull { label: String },

    #[error("プール停止エラー: 停止後のタスク投入はできません - {label}")]
    PoolClosed { label: String },

    #[error("チャンネルエラー: {message}")]
    ChannelError { message: String },

    #[error("タスク合流エラー: {source}")]
    TaskJoinError {
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("ワーカーエラー: {source}")]
    WorkerError {
        #[source]
        source: anyhow::Error,
    },

    #[error("永続化エラー: {source}")]
    PersistenceError {
        #[source]
        source: anyhow::Error,
    },
}

impl PoolError {
    /// 設定エラーの作成
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// キュー満杯エラーの作成
    pub fn queue_full(label: impl Into<String>) -> Self {
        Self::QueueFull {
            label: label.into(),
        }
    }

    /// プール停止エラーの作成
    pub fn pool_closed(label: impl Into<String>) -> Self {
        Self::PoolClosed {
            label: label.into(),
        }
    }

    /// チャンネルエラーの作成
    pub fn channel(message: impl Into<String>) -> Self {
        Self::ChannelError {
            message: message.into(),
        }
    }

    /// タスク合流エラーの作成
    pub fn task_join(source: tokio::task::JoinError) -> Self {
        Self::TaskJoinError { source }
    }

    /// ワーカーエラーの作成
    pub fn worker(source: anyhow::Error) -> Self {
        Self::WorkerError { source }
    }

    /// 永続化エラーの作成
    pub fn persistence(source: anyhow::Error) -> Self {
        Self::PersistenceError { source }
    }
}

/// プール操作の標準Result型
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// 個別タスクの失敗理由
///
/// TaskHandleが非成功時に解決する値。
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("タスク実行エラー: {label} - {source}")]
    Failed {
        label: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("タスクキャンセル: {label}")]
    Cancelled { label: String },

    #[error("タスクパニック: {label} - {message}")]
    Panicked { label: String, message: String },

    #[error("タスク放棄: プール停止により結果が届きませんでした - {label}")]
    Abandoned { label: String },
}

impl TaskError {
    /// 実行エラーの作成
    pub fn failed(label: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Failed {
            label: label.into(),
            source,
        }
    }

    /// キャンセルエラーの作成
    pub fn cancelled(label: impl Into<String>) -> Self {
        Self::Cancelled {
            label: label.into(),
        }
    }

    /// パニックエラーの作成
    pub fn panicked(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            label: label.into(),
            message: message.into(),
        }
    }

    /// 放棄エラーの作成
    pub fn abandoned(label: impl Into<String>) -> Self {
        Self::Abandoned {
            label: label.into(),
        }
    }

    /// キャンセル起因かどうか
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

// 完了記録永続化の具象実装

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex as AsyncMutex;

use crate::core::types::CompletionRecord;
use crate::core::ResultSink;

/// メモリ内保存の永続化実装（テスト用および開発用）
/// モックテストにも使用可能な完全機能実装
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSink {
    records: Arc<Mutex<Vec<CompletionRecord>>>,
    run_info: Arc<Mutex<Option<serde_json::Value>>>,
    finalized: Arc<Mutex<bool>>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用：保存された記録を取得
    pub fn records(&self) -> Vec<CompletionRecord> {
        self.records.lock().unwrap().clone()
    }

    /// テスト用：保存された記録数を取得
    pub fn stored_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// テスト用：実行情報を取得
    pub fn run_info(&self) -> Option<serde_json::Value> {
        self.run_info.lock().unwrap().clone()
    }

    /// テスト用：完了状態を確認
    pub fn is_finalized(&self) -> bool {
        *self.finalized.lock().unwrap()
    }

    /// テスト用：特定ラベルの記録が保存されているかチェック
    pub fn contains_label(&self, label: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|record| record.label == label)
    }

    /// テスト用：データクリア
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
        *self.run_info.lock().unwrap() = None;
        *self.finalized.lock().unwrap() = false;
    }
}

#[async_trait]
impl ResultSink for MemoryResultSink {
    async fn store_batch(&self, records: &[CompletionRecord]) -> Result<()> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn set_run_info(&self, info: serde_json::Value) -> Result<()> {
        *self.run_info.lock().unwrap() = Some(info);
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        *self.finalized.lock().unwrap() = true;
        Ok(())
    }
}

/// JSON Lines形式でのストリーミング永続化実装
///
/// 1行目に実行情報、以降1タスク1行で完了記録を書き出す。
/// ファイルは最初の書き込み時に遅延初期化される。
pub struct JsonlResultSink {
    file_path: PathBuf,
    writer: Arc<AsyncMutex<Option<BufWriter<File>>>>,
}

impl JsonlResultSink {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            writer: Arc::new(AsyncMutex::new(None)),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// ファイルを初期化（既存内容は破棄）
    async fn initialize_file(&self) -> Result<()> {
        let mut writer_guard = self.writer.lock().await;
        if writer_guard.is_some() {
            return Ok(());
        }

        // 親ディレクトリが存在しない場合は作成
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| anyhow::anyhow!("ディレクトリ作成エラー: {e}"))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.file_path)
            .await
            .map_err(|e| anyhow::anyhow!("ファイル作成エラー: {e}"))?;

        *writer_guard = Some(BufWriter::new(file));
        Ok(())
    }

    async fn write_line(&self, line: String) -> Result<()> {
        self.initialize_file().await?;

        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("ライターが初期化されていません"))?;

        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("書き込みエラー: {e}"))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| anyhow::anyhow!("書き込みエラー: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonlResultSink {
    async fn store_batch(&self, records: &[CompletionRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| anyhow::anyhow!("JSON変換エラー: {e}"))?;
            self.write_line(line).await?;
        }
        Ok(())
    }

    async fn set_run_info(&self, info: serde_json::Value) -> Result<()> {
        let line = serde_json::to_string(&serde_json::json!({ "run_info": info }))
            .map_err(|e| anyhow::anyhow!("JSON変換エラー: {e}"))?;
        self.write_line(line).await
    }

    async fn finalize(&self) -> Result<()> {
        let mut writer_guard = self.writer.lock().await;
        if let Some(writer) = writer_guard.as_mut() {
            writer
                .flush()
                .await
                .map_err(|e| anyhow::anyhow!("フラッシュエラー: {e}"))?;
        }
        // ライターを閉じて以降の書き込みを遮断
        *writer_guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{TaskId, TaskMetadata, TaskStatus};
    use tempfile::TempDir;

    fn sample_record(index: u64) -> CompletionRecord {
        CompletionRecord {
            id: TaskId(index),
            label: format!("task{index}"),
            status: TaskStatus::Completed,
            error: None,
            metadata: TaskMetadata {
                queue_wait_ms: 1,
                run_time_ms: 10,
                worker_id: Some(0),
                finished_at: chrono::Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_memory_sink_stores_batches() {
        let sink = MemoryResultSink::new();

        sink.store_batch(&[sample_record(1), sample_record(2)])
            .await
            .unwrap();
        sink.store_batch(&[sample_record(3)]).await.unwrap();

        assert_eq!(sink.stored_count(), 3);
        assert!(sink.contains_label("task2"));
        assert!(!sink.contains_label("task9"));
    }

    #[tokio::test]
    async fn test_memory_sink_finalize_and_clear() {
        let sink = MemoryResultSink::new();

        assert!(!sink.is_finalized());
        sink.finalize().await.unwrap();
        assert!(sink.is_finalized());

        sink.clear();
        assert!(!sink.is_finalized());
        assert_eq!(sink.stored_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_run_info() {
        let sink = MemoryResultSink::new();

        sink.set_run_info(serde_json::json!({"worker_count": 4}))
            .await
            .unwrap();

        let info = sink.run_info().unwrap();
        assert_eq!(info["worker_count"], 4);
    }

    #[tokio::test]
    async fn test_memory_sink_clone_shares_storage() {
        let sink = MemoryResultSink::new();
        let shared = sink.clone();

        shared.store_batch(&[sample_record(1)]).await.unwrap();

        assert_eq!(sink.stored_count(), 1);
    }

    #[tokio::test]
    async fn test_jsonl_sink_writes_records_as_lines() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("results.jsonl");
        let sink = JsonlResultSink::new(&output);

        sink.set_run_info(serde_json::json!({"worker_count": 2}))
            .await
            .unwrap();
        sink.store_batch(&[sample_record(1), sample_record(2)])
            .await
            .unwrap();
        sink.finalize().await.unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        // 1行目は実行情報
        let header: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header["run_info"]["worker_count"], 2);

        // 以降は完了記録
        let restored: CompletionRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(restored.label, "task1");
    }

    #[tokio::test]
    async fn test_jsonl_sink_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("nested").join("deep").join("out.jsonl");
        let sink = JsonlResultSink::new(&output);

        sink.store_batch(&[sample_record(1)]).await.unwrap();
        sink.finalize().await.unwrap();

        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_jsonl_sink_empty_batch_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("untouched.jsonl");
        let sink = JsonlResultSink::new(&output);

        sink.store_batch(&[]).await.unwrap();
        sink.finalize().await.unwrap();

        // 空バッチのみではファイルは作成されない
        assert!(!output.exists());
    }
}

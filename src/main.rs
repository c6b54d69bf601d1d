use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

// ワーカープールAPIをインポート
use task_pool::{
    ConsolePoolObserver, DefaultPoolConfig, JsonlResultSink, PoolConfig, TaskError, WorkerPool,
};

#[derive(Parser)]
#[command(name = "task_pool")]
#[command(about = "A bounded worker pool demo with synthetic tasks")]
#[command(version)]
struct Args {
    /// 実行するタスク数
    #[arg(short, long, default_value = "100")]
    tasks: usize,

    /// ワーカー数（省略時はCPU数x2）
    #[arg(short, long)]
    workers: Option<usize>,

    /// 完了記録の出力ファイル（JSON Lines）
    #[arg(short, long, default_value = "task_results.jsonl")]
    output: PathBuf,
}

/// 模擬タスク: 軽いスリープの後に平方和を計算する
///
/// 7で割って3余るインデックスは意図的に失敗させ、
/// エラー経路も記録に残るようにしている。
async fn synthetic_task(index: usize) -> Result<u64> {
    tokio::time::sleep(Duration::from_millis((index % 10) as u64)).await;

    if index % 7 == 3 {
        anyhow::bail!("模擬エラー: タスク{index}");
    }

    let bound = (index % 1000) as u64;
    Ok((0..=bound).map(|value| value * value).sum())
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("🚀 タスクプールデモ - 並列実行版");

    let args = Args::parse();

    let mut config = DefaultPoolConfig::default();
    if let Some(workers) = args.workers {
        config = config.with_worker_count(workers).with_max_concurrent(workers);
    }

    println!("📂 タスク数: {}", args.tasks);
    println!("📄 出力ファイル: {}", args.output.display());

    // プール構築
    let pool = WorkerPool::start(
        config,
        ConsolePoolObserver::new(),
        JsonlResultSink::new(&args.output),
    )
    .await?;

    println!("⚙️  設定:");
    println!("   - ワーカー数: {}", pool.config().worker_count());
    println!("   - 最大同時実行数: {}", pool.config().max_concurrent_tasks());
    println!("   - キュー容量: {}", pool.config().queue_capacity());

    // タスク投入と結果待機
    let submitter = pool.handle();
    let mut handles = Vec::with_capacity(args.tasks);
    for index in 0..args.tasks {
        let handle = submitter
            .submit(format!("synthetic-{index}"), synthetic_task(index))
            .await?;
        handles.push(handle);
    }

    let mut failed_labels = Vec::new();
    for handle in handles {
        let label = handle.label().to_string();
        if let Err(error) = handle.await {
            if !matches!(error, TaskError::Cancelled { .. }) {
                failed_labels.push(label);
            }
        }
    }

    match pool.shutdown().await {
        Ok(summary) => {
            println!("\n✅ 処理完了!");
            println!("📊 実行結果:");
            println!("   - 投入タスク数: {}", summary.submitted);
            println!("   - 成功数: {}", summary.completed);
            println!("   - 失敗数: {}", summary.failed);
            println!("   - キャンセル数: {}", summary.cancelled);
            println!("   - 総実行時間: {:.2}秒", summary.total_time_ms as f64 / 1000.0);
            println!(
                "   - 平均処理時間: {:.2}ms/タスク",
                summary.average_task_time_ms
            );

            if !failed_labels.is_empty() {
                println!("⚠️  {}個のタスクが失敗しました", failed_labels.len());
            }

            println!("📄 完了記録は {} に保存されました", args.output.display());
        }
        Err(error) => {
            eprintln!("❌ エラー: {error}");
            std::process::exit(1);
        }
    }

    Ok(())
}

//! ワーカー数ごとのスループット比較ベンチマーク
//!
//! 同一の合成タスク一式を異なるワーカー数で実行して測定する

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use task_pool::{DefaultPoolConfig, MemoryResultSink, NoOpPoolObserver, WorkerPool};

const TASK_COUNT: usize = 100;

/// 軽量な合成タスク一式をプールで実行する
async fn run_synthetic_batch(worker_count: usize) -> usize {
    let pool: WorkerPool<u64, _, _, _> = WorkerPool::start(
        DefaultPoolConfig::default()
            .with_worker_count(worker_count)
            .with_max_concurrent(worker_count)
            .with_progress_reporting(false),
        NoOpPoolObserver::new(),
        MemoryResultSink::new(),
    )
    .await
    .expect("pool start failed");

    let tasks: Vec<(String, _)> = (0..TASK_COUNT)
        .map(|index| {
            (format!("bench-{index}"), async move {
                let bound = (index % 64) as u64;
                Ok((0..=bound).map(|value| value * value).sum::<u64>())
            })
        })
        .collect();

    let (results, summary) = pool.run_batch(tasks).await.expect("batch failed");
    assert_eq!(summary.completed, TASK_COUNT);
    results.len()
}

/// ワーカースケーリングのベンチマーク
fn benchmark_worker_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Worker Scaling");
    group.measurement_time(Duration::from_secs(10));

    for worker_count in [1usize, 2, 4] {
        group.bench_function(format!("{worker_count} workers"), |b| {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            b.iter(|| {
                let processed = runtime.block_on(run_synthetic_batch(worker_count));
                std::hint::black_box(processed)
            })
        });
    }

    group.finish();
}

/// 投入オーバーヘッドのベンチマーク
fn benchmark_submission_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("Submission Overhead");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("submit and await single task", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        b.iter(|| {
            let value = runtime.block_on(async {
                let pool: WorkerPool<u64, _, _, _> = WorkerPool::start(
                    DefaultPoolConfig::default()
                        .with_worker_count(1)
                        .with_progress_reporting(false),
                    NoOpPoolObserver::new(),
                    MemoryResultSink::new(),
                )
                .await
                .expect("pool start failed");

                let handle = pool
                    .handle()
                    .submit("single", async { Ok(1u64) })
                    .await
                    .expect("submit failed");
                let value = handle.await.expect("task failed");
                pool.shutdown().await.expect("shutdown failed");
                value
            });
            std::hint::black_box(value)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_worker_scaling,
    benchmark_submission_overhead
);
criterion_main!(benches);

//! Benchmarks for the retry scheduler.
//!
//! Benchmarks cover:
//! - ClientPool checkout and return
//! - End-to-end dispatch with immediate success
//! - End-to-end dispatch with retries and client exclusion

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use retry_lot::builders::SchedulerBuilder;
use retry_lot::config::ExclusionPolicy;
use retry_lot::core::{Client, ClientPool, EffortExecutor, Outcome, Task};

use async_trait::async_trait;
use tokio::runtime::Runtime;

// ============================================================================
// Bench Executor
// ============================================================================

/// Fails the first `failures` attempts of every task, then succeeds.
#[derive(Clone)]
struct BenchExecutor {
    failures: u32,
}

#[async_trait]
impl EffortExecutor<u64, u64> for BenchExecutor {
    async fn execute(&self, client: &mut Client<u64>, task: &Task<u64>) -> Outcome {
        black_box(**client ^ *task.payload());
        if task.attempts_made() <= self.failures {
            Outcome::Retry
        } else {
            Outcome::Success
        }
    }
}

// ============================================================================
// Pool Benchmarks
// ============================================================================

fn bench_pool_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_acquire_release");

    for size in [4_u64, 64, 512] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let pool = ClientPool::new(0..size);
            let pool = &pool;
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let mut held = Vec::with_capacity(size as usize);
                for _ in 0..size {
                    held.push(pool.acquire().await.unwrap());
                }
                for client in held {
                    pool.release(client);
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch_immediate_success(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_immediate_success");

    for tasks in [100_u64, 1_000] {
        group.throughput(Throughput::Elements(tasks));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let scheduler = SchedulerBuilder::new()
                    .clients(0..8_u64)
                    .tasks(0..tasks)
                    .attempts(1)
                    .build(BenchExecutor { failures: 0 })
                    .unwrap();
                black_box(scheduler.run().await.unwrap());
            });
        });
    }
    group.finish();
}

fn bench_dispatch_with_retries(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_with_retries");

    for policy in [ExclusionPolicy::Exhaust, ExclusionPolicy::Recycle] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{policy:?}")),
            &policy,
            |b, &policy| {
                b.to_async(Runtime::new().unwrap()).iter(|| async move {
                    let scheduler = SchedulerBuilder::new()
                        .clients(0..4_u64)
                        .tasks(0..500_u64)
                        .attempts(5)
                        .exclusion_policy(policy)
                        .build(BenchExecutor { failures: 3 })
                        .unwrap();
                    black_box(scheduler.run().await.unwrap());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(pool_benches, bench_pool_acquire_release);

criterion_group!(
    dispatch_benches,
    bench_dispatch_immediate_success,
    bench_dispatch_with_retries
);

criterion_main!(pool_benches, dispatch_benches);

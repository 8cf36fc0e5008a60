//! Benchmarks for column renumbering and full-list persistence
//!
//! Every reorder renumbers the whole column and every mutation rewrites the
//! whole namespace, so both scale with column and board size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use taskboard_kanban::task::reorder::reorder_column;
use taskboard_kanban::{
    Board, DropPosition, NewTask, Task, TaskCollection, TaskId, TaskPersistence,
};
use taskboard_store::{MemoryBlobStore, MemoryScalarStore};
use tokio::runtime::Runtime;

fn column(size: usize) -> Vec<Task> {
    (0..size)
        .map(|i| {
            Task::new(format!("task {i}"), "todo")
                .with_id(format!("t{i}"))
                .with_priority(i as u32)
        })
        .collect()
}

/// Move the last task to the front, the worst case for renumbering
fn bench_reorder_column(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder_column");
    for size in [10usize, 100, 1000] {
        let tasks = column(size);
        let dragged = TaskId::from_string(format!("t{}", size - 1));
        let target = TaskId::from_string("t0");
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || tasks.clone(),
                |mut tasks| {
                    reorder_column(&mut tasks, &dragged, &target, DropPosition::Before)
                        .expect("reorder failed");
                    black_box(tasks)
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

/// Add one task to a collection that already holds `size` tasks
fn bench_add_and_persist(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("add_and_persist");
    group.sample_size(20);

    for size in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    rt.block_on(async {
                        let persistence = Arc::new(TaskPersistence::new(
                            Arc::new(MemoryBlobStore::new()),
                            Arc::new(MemoryScalarStore::new()),
                        ));
                        let mut collection =
                            TaskCollection::for_board(persistence, &Board::new("Bench")).await;
                        collection
                            .replace_all(column(size))
                            .await
                            .expect("seed failed");
                        collection
                    })
                },
                |mut collection| {
                    rt.block_on(async {
                        let task = collection
                            .create(NewTask::new("new", "todo"))
                            .expect("create failed");
                        collection.add(task).await.expect("add failed");
                        black_box(collection.len())
                    })
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reorder_column, bench_add_and_persist);
criterion_main!(benches);

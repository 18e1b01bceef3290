// Benchmark response store operations: append and full load, per backend.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use tally_core::questionnaire::questions;
use tally_core::store::ResponseStore;
use tally_core::store::flat_file::CsvStore;
use tally_core::store::sqlite::SqliteStore;
use tally_core::types::Answers;

fn answers(i: usize) -> Answers {
    questions()
        .iter()
        .filter(|q| q.required)
        .map(|q| (q.field.to_string(), q.options[i % q.options.len()].to_string()))
        .collect()
}

fn fill(store: &dyn ResponseStore, n: usize) {
    for i in 0..n {
        store.append(answers(i)).unwrap();
    }
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_append");
    group.sample_size(20);

    group.bench_function("sqlite_in_memory", |b| {
        let store = SqliteStore::in_memory().unwrap();
        let mut i = 0;
        b.iter(|| {
            store.append(answers(i)).unwrap();
            i += 1;
        });
    });

    group.bench_function("csv", |b| {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("respostas.csv"));
        let mut i = 0;
        b.iter(|| {
            store.append(answers(i)).unwrap();
            i += 1;
        });
    });

    group.finish();
}

fn bench_load_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_load_all");

    for count in [100, 1_000] {
        let sqlite = SqliteStore::in_memory().unwrap();
        fill(&sqlite, count);
        group.bench_with_input(BenchmarkId::new("sqlite", count), &count, |b, _| {
            b.iter(|| sqlite.load_all().unwrap());
        });

        let dir = tempfile::tempdir().unwrap();
        let csv = CsvStore::new(dir.path().join("respostas.csv"));
        fill(&csv, count);
        group.bench_with_input(BenchmarkId::new("csv", count), &count, |b, _| {
            b.iter(|| csv.load_all().unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append, bench_load_all);
criterion_main!(benches);

//! Entry Run Performance Benchmarks
//!
//! Measures:
//! - Rendering row lines for growing tables
//! - A full `list` run against `SQLite`
//! - A full `add` run against `SQLite` (the table grows across iterations)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use employee_entry::output::render_rows;
use employee_entry::Employee;

fn sample_rows(count: i64) -> Vec<Employee> {
    (1..=count)
        .map(|i| Employee {
            id: i,
            name: Some(format!("Employee {i}")),
            department: Some("Engineering".to_string()),
            salary: Some(50000.0 + i as f64 * 0.25),
        })
        .collect()
}

fn bench_render_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_rows");

    for count in [10, 1_000, 10_000] {
        let rows = sample_rows(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            b.iter(|| {
                let mut out = Vec::with_capacity(rows.len() * 64);
                render_rows(&mut out, black_box(rows)).unwrap();
                out
            });
        });
    }

    group.finish();
}

#[cfg(feature = "sqlite")]
fn create_db(dir: &std::path::Path, rows: usize) -> std::path::PathBuf {
    let path = dir.join("bench.db");
    let conn = rusqlite::Connection::open(&path).expect("Failed to create database");
    conn.execute_batch(
        "CREATE TABLE employees (
            emp_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            department TEXT,
            salary REAL
        )",
    )
    .expect("Failed to create table");

    for i in 0..rows {
        conn.execute(
            "INSERT INTO employees (name, department, salary) VALUES (?1, 'Sales', ?2)",
            rusqlite::params![format!("Employee {i}"), 40000.0 + i as f64],
        )
        .expect("Failed to insert");
    }
    path
}

#[cfg(feature = "sqlite")]
fn bench_sqlite_list(c: &mut Criterion) {
    use employee_entry::{run_with_config, ConnectionConfig, Operation};

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = ConnectionConfig::sqlite(create_db(dir.path(), 1_000));
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    c.bench_function("sqlite_list_1000_rows", |b| {
        b.iter(|| {
            let outcome = runtime.block_on(run_with_config(black_box(&config), &Operation::List));
            assert!(outcome.result.is_ok());
            outcome
        });
    });
}

#[cfg(feature = "sqlite")]
fn bench_sqlite_add(c: &mut Criterion) {
    use employee_entry::{run_with_config, ConnectionConfig, NewEmployee, Operation};

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = ConnectionConfig::sqlite(create_db(dir.path(), 0));
    let operation = Operation::Add(NewEmployee::new("Alice", "Engineering", 75000.5));
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    c.bench_function("sqlite_add", |b| {
        b.iter(|| {
            let outcome = runtime.block_on(run_with_config(black_box(&config), &operation));
            assert!(outcome.result.is_ok());
            outcome
        });
    });
}

#[cfg(feature = "sqlite")]
criterion_group!(benches, bench_render_rows, bench_sqlite_list, bench_sqlite_add);

#[cfg(not(feature = "sqlite"))]
criterion_group!(benches, bench_render_rows);

criterion_main!(benches);

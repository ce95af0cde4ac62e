//! Benchmarks of the drive loop (`ModelHydro::run`) across a few model
//! shapes and run lengths, mirroring the teacher's `random_models.rs`
//! bench-group-per-shape layout but over this crate's solver/process stack
//! instead of an LP solve per step.
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use hydrobricks_core::model_hydro::ModelHydro;
use hydrobricks_core::test_utils::{cascade_linear_storage_model, linear_storage_model, snowpack_degree_day_model, uniform_forcing};

fn bench_linear_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("drive-loop-linear-storage");
    for &n_days in &[50usize, 200, 1000] {
        group.throughput(Throughput::Elements(n_days as u64));
        group.bench_with_input(BenchmarkId::new("euler", n_days), &n_days, |b, &n_days| {
            b.iter(|| {
                let (model, basin) = linear_storage_model("euler_explicit", 0.3, n_days as u64);
                let mut precip = vec![10.0; 4];
                precip.extend(std::iter::repeat(0.0).take(n_days - 4));
                let forcings = uniform_forcing(n_days as u64, Some(precip), None);
                let mut m = ModelHydro::build(model, basin, forcings).expect("model builds");
                m.run().expect("run succeeds")
            });
        });
    }
    group.finish();
}

fn bench_cascade_rk4(c: &mut Criterion) {
    let mut group = c.benchmark_group("drive-loop-cascade-rk4");
    for &n_days in &[50usize, 200, 1000] {
        group.throughput(Throughput::Elements(n_days as u64));
        group.bench_with_input(BenchmarkId::new("rk4", n_days), &n_days, |b, &n_days| {
            b.iter(|| {
                let (model, basin) = cascade_linear_storage_model("runge_kutta", 0.5, 0.3, n_days as u64);
                let mut precip = vec![10.0; 4];
                precip.extend(std::iter::repeat(0.0).take(n_days - 4));
                let forcings = uniform_forcing(n_days as u64, Some(precip), None);
                let mut m = ModelHydro::build(model, basin, forcings).expect("model builds");
                m.run().expect("run succeeds")
            });
        });
    }
    group.finish();
}

fn bench_snowpack_degree_day(c: &mut Criterion) {
    let mut group = c.benchmark_group("drive-loop-snowpack-degree-day");
    for &n_days in &[50usize, 200, 1000] {
        group.throughput(Throughput::Elements(n_days as u64));
        group.bench_with_input(BenchmarkId::new("euler", n_days), &n_days, |b, &n_days| {
            b.iter(|| {
                let (model, basin) = snowpack_degree_day_model(n_days as u64, 3.0, 2.0, 0.0, 2.0);
                let mut precip = vec![10.0; n_days - 1];
                precip.push(0.0);
                let mut temp = vec![-2.0, -1.0, -1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 9.0];
                while temp.len() < n_days {
                    temp.push(9.0);
                }
                temp.truncate(n_days);
                let forcings = uniform_forcing(n_days as u64, Some(precip), Some(temp));
                let mut m = ModelHydro::build(model, basin, forcings).expect("model builds");
                m.run().expect("run succeeds")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_linear_storage, bench_cascade_rk4, bench_snowpack_degree_day);
criterion_main!(benches);

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Channelizer throughput: blocks per second through the overlap-save
//! engine at a typical wideband configuration.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use hsdr::dsp::{FastConvolver, OutputMode};
use num_complex::Complex;

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("channelizer");

    for &(l, m, d) in &[(3_840usize, 961usize, 1usize), (12_288, 4_097, 8)] {
        let mut filt = FastConvolver::new(l, m, d, OutputMode::Complex).unwrap();
        filt.set_response(192_000.0, -8_000.0, 8_000.0, 11.0).unwrap();
        let block: Vec<Complex<f32>> = (0..l)
            .map(|i| Complex::new((i as f32 * 0.37).sin(), (i as f32 * 0.11).cos()))
            .collect();

        group.throughput(Throughput::Elements(l as u64));
        group.bench_function(format!("L{l}_M{m}_D{d}"), |b| {
            b.iter(|| {
                filt.input_mut().copy_from_slice(&block);
                filt.execute().unwrap();
                criterion::black_box(filt.output().len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);

use bigdecimal::BigDecimal;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::str::FromStr;

use common_money::{init_rounding_mode_from_env, normalize_scale, round_bankers, round_half_up, truncate_scale};

fn bench_normalize(c: &mut Criterion) {
    std::env::remove_var("MONEY_ROUNDING");
    // ensure default
    init_rounding_mode_from_env();
    let samples: Vec<BigDecimal> = [
        "1.005", "2.675", "0.005", "-1.005", "-2.505", "12345", "19.90", "1000000.555",
        "-999999.995", "0.3349", "42.4242",
    ]
    .into_iter()
    .map(|s| BigDecimal::from_str(s).unwrap())
    .collect();
    c.bench_function("normalize_scale_default_half_up", |b| {
        b.iter(|| {
            for v in &samples {
                black_box(normalize_scale(v));
            }
        });
    });
}

fn bench_modes_compare(c: &mut Criterion) {
    let samples: Vec<BigDecimal> = (0..500)
        .map(|i| {
            let s = format!("{}.{:03}", i, i % 1000);
            BigDecimal::from_str(&s).unwrap()
        })
        .collect();

    // The process-wide mode lives in a OnceLock, so each mode's function is
    // benchmarked directly rather than through the env switch.
    c.bench_function("round_mode_truncate", |b| {
        b.iter(|| {
            for v in &samples {
                black_box(truncate_scale(v));
            }
        });
    });
    c.bench_function("round_mode_half_up", |b| {
        b.iter(|| {
            for v in &samples {
                black_box(round_half_up(v));
            }
        });
    });
    c.bench_function("round_mode_bankers", |b| {
        b.iter(|| {
            for v in &samples {
                black_box(round_bankers(v));
            }
        });
    });
}

criterion_group!(rounding, bench_normalize, bench_modes_compare);
criterion_main!(rounding);

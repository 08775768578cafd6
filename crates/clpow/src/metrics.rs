#![cfg(feature = "metrics")]

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

/* ───────────── Raw stage latencies ──────────────────── */

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Call from the pipeline: `record("build", t0)`.
pub fn record(stage: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    if let Ok(mut times) = TIMES.lock() {
        times.push((stage, dur));
    }
}

/* ───────────── Host <-> device traffic ───────────────── */

pub static BYTES_MOVED: AtomicUsize = AtomicUsize::new(0);

/* ───────────── Summary ──────────────────────────────── */

/// Printed to stderr once the run is over.
pub fn summary() {
    let mut map: BTreeMap<&str, Vec<u128>> = BTreeMap::new();
    if let Ok(mut times) = TIMES.lock() {
        for (stage, us) in times.drain(..) {
            map.entry(stage).or_default().push(us);
        }
    }

    eprintln!("── metrics summary ──");
    let mut transfer_us = 0u128;
    for (stage, mut v) in map {
        v.sort_unstable();
        let total: u128 = v.iter().sum();
        let mean = total / v.len() as u128;
        let p95 = v[((v.len() * 95) / 100).saturating_sub(1)];
        eprintln!("{stage:<18} n={:<3} mean={mean:>8} µs   p95={p95:>8} µs", v.len());
        if stage.starts_with("enqueue_") {
            transfer_us += total;
        }
    }

    let bytes = BYTES_MOVED.load(Ordering::Relaxed);
    eprintln!("host<->device: {} MiB", bytes / 1024 / 1024);
    if transfer_us > 0 {
        let gbps = bytes as f64 / transfer_us as f64 / 1e3;
        eprintln!("    ↳ throughput ≈ {gbps:.2} GB/s");
    }
}

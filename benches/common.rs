#![allow(dead_code)]

use chudnovsky::{Computation, PiOutcome, PoolBackend, RunConfig};

/// True when `PI_BENCH_VERBOSE` is set, to print sanity output before timing.
pub fn verbose() -> bool {
    std::env::var_os("PI_BENCH_VERBOSE").is_some()
}

/// Runs one computation, panicking on failure.
pub fn run(digits: u64, workers: usize, backend: PoolBackend) -> PiOutcome {
    let config = RunConfig::new(digits)
        .with_workers(workers)
        .with_backend(backend);
    Computation::new(config)
        .and_then(|computation| computation.run())
        .expect("pi computation should succeed")
}

//! Criterion benchmarks for the relationship workloads
//!
//! These run against a live OpenFGA server, configured through the same
//! layers as the binary (`config/*.toml`, `FGA_BENCH_*`, `OPENFGA_API_URL`,
//! `OPENFGA_API_TOKEN`). Every benchmark bootstraps its own store and deletes
//! it afterwards.
//!
//! # Running Benchmarks
//!
//! ```bash
//! OPENFGA_API_URL=http://localhost:8080 cargo bench --features=benchmarks
//! cargo bench --features=benchmarks -- transitive
//! ```
//!
//! Results land in `target/criterion/`, HTML reports included.

pub mod workloads;

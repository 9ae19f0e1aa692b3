//! DST - Deterministic Simulation Testing
//!
//! Seeded operation streams for checking that every backend behaves the same.
//!
//! # Usage
//!
//! ```rust
//! use ipam_store::{apply, DeterministicRng, MemoryBackend, OpGenerator, RequestContext};
//!
//! # tokio_test::block_on(async {
//! let backend = MemoryBackend::new();
//! let cx = RequestContext::background();
//! let mut ops = OpGenerator::new(DeterministicRng::new(42));
//!
//! for op in ops.take(100) {
//!     let _outcome = apply(&backend, &cx, op).await;
//! }
//! # });
//! ```
//!
//! Run with explicit seed for reproducibility:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

mod ops;
mod rng;

pub use ops::{apply, OpGenerator, OpOutcome, PrefixOp};
pub use rng::DeterministicRng;

//! Per-stream RNG seeding with ChaCha8.
//!
//! Mutation and seed selection each get their own ChaCha8Rng seeded from
//! `(global_seed + stream_id)`. Same seed -> same campaign, always.
//! Without a global seed the streams are seeded from OS entropy.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Stream used by the mutation engine.
pub const MUTATION_STREAM: u64 = 0;
/// Stream used by seed selection.
pub const SELECTION_STREAM: u64 = 1;

/// Create a deterministic RNG for a given global seed and stream ID.
pub fn stream_rng(global_seed: u64, stream_id: u64) -> ChaCha8Rng {
    let combined = global_seed.wrapping_add(stream_id);
    ChaCha8Rng::seed_from_u64(combined)
}

/// Seeded stream when a global seed is configured, entropy otherwise.
pub fn campaign_rng(global_seed: Option<u64>, stream_id: u64) -> ChaCha8Rng {
    match global_seed {
        Some(seed) => stream_rng(seed, stream_id),
        None => ChaCha8Rng::from_entropy(),
    }
}

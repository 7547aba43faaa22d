use rand::distributions::Standard;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::error::GridError;

/// Derive the decorrelated seed for the cluster at `(cx, cy)`.
///
/// The world seed and both coordinates are written as 8 big-endian bytes each
/// (coordinates sign-extended to `i64`) and hashed with SHA-256; the first
/// 8 digest bytes form the result. Pure and traversal-order independent.
pub fn cluster_seed(world_seed: u64, cx: i32, cy: i32) -> u64 {
    let mut payload = [0u8; 24];
    payload[..8].copy_from_slice(&world_seed.to_be_bytes());
    payload[8..16].copy_from_slice(&i64::from(cx).to_be_bytes());
    payload[16..].copy_from_slice(&i64::from(cy).to_be_bytes());

    let digest = Sha256::digest(payload);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// The coordinate-local random stream for a cluster.
pub fn cluster_rng(world_seed: u64, cx: i32, cy: i32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(cluster_seed(world_seed, cx, cy))
}

/// Weighted categorical draw.
///
/// Draws `u` in `[0, 1)` from the stream, scales it by the total weight, then
/// walks the cumulative sum and returns the first item whose running total
/// meets or exceeds the draw. Rounding that leaves every item short falls
/// back to the last item. Consumes exactly one `f64` from the stream.
pub fn weighted_choice<T: Copy, R: Rng + ?Sized>(
    rng: &mut R,
    items: &[(T, f64)],
) -> Result<T, GridError> {
    let Some(&(last, _)) = items.last() else {
        return Err(GridError::EmptyWeights);
    };
    let total: f64 = items.iter().map(|(_, w)| w).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(GridError::InvalidWeights { total });
    }

    let u: f64 = rng.sample(Standard);
    let draw = u * total;
    let mut acc = 0.0;
    for &(item, weight) in items {
        acc += weight;
        if draw <= acc {
            return Ok(item);
        }
    }
    Ok(last)
}

//! Deterministic seed mixing and bounded random draws for city generation.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::Rng;

/// Murmur3-style finalizer over a seed and a stream index.
pub(super) fn mix_seed_stream(seed: u64, stream: u64) -> u64 {
    let mut mixed = seed ^ stream.wrapping_mul(0xD6E8_FD9A_5B89_7A4D);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    mixed ^ (mixed >> 33)
}

/// Per-building RNG seed, independent of the order other buildings draw in.
pub(super) fn derive_building_seed(city_seed: u64, building_index: u64) -> u64 {
    let mut mixed = city_seed ^ 0x9E37_79B9_7F4A_7C15;
    mixed ^= building_index.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 30;
    mixed = mixed.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 27;
    mixed = mixed.wrapping_mul(0x94D0_49BB_1331_11EB);
    mixed ^ (mixed >> 31)
}

/// Uniform draw in `min..=max`.
pub(super) fn rand_range(rng: &mut ChaCha8Rng, min: i32, max: i32) -> i32 {
    debug_assert!(min <= max);
    let span = (max - min + 1) as u32;
    min + (rng.next_u32() % span) as i32
}

/// `numerator`-in-`denominator` random draw.
pub(super) fn rand_chance(rng: &mut ChaCha8Rng, numerator: u32, denominator: u32) -> bool {
    rng.next_u32() % denominator < numerator
}

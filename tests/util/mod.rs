#![allow(unused)]

use astc_endpoints::{ColorQuantTables, QUANT_RANGES};
use rand::SeedableRng;

pub fn create_rng() -> impl rand::Rng {
    rand_chacha::ChaChaRng::seed_from_u64(123456789)
}

/// Tables where both directions are the identity map at every level.
/// Everything round-trips exactly, which makes expected outputs easy to
/// compute by hand.
pub fn identity_tables() -> ColorQuantTables {
    ColorQuantTables::from_fn(|_, v| v, |_, v| v)
}

/// Tables with the real per-level codepoint counts, rounding linearly.
pub fn ranged_tables() -> ColorQuantTables {
    ColorQuantTables::from_fn(
        |level, v| {
            let max = (QUANT_RANGES[level] - 1) as f32;
            (v as f32 / 255.0 * max + 0.5) as u8
        },
        |level, q| {
            let max = QUANT_RANGES[level] - 1;
            ((q as u16).min(max) as f32 / max as f32 * 255.0 + 0.5) as u8
        },
    )
}

use glam::Vec4;

use super::{round_i32, trunc_i32};
use crate::quant::ColorQuantTables;

/// LDR components arrive in `[0, 65535]` and quantize through `[0, 255]`.
const UNORM16_TO_UNORM8: f32 = 1.0 / 257.0;

/// The endpoint-nudging offsets of [`quantize_rgb`] move by 0.2 per
/// iteration, so this many iterations saturate both endpoints against the
/// `[0, 255]` clamp even for a fully reversed white/black pair.
const MAX_ORDER_ITERS: u32 = 1300;

#[inline]
fn clamp255(x: f32) -> f32 {
    x.clamp(0.0, 255.0)
}

#[inline]
fn scaled_rgb(color: Vec4) -> [f32; 3] {
    [
        color.x * UNORM16_TO_UNORM8,
        color.y * UNORM16_TO_UNORM8,
        color.z * UNORM16_TO_UNORM8,
    ]
}

#[inline]
fn scaled_alpha(color: Vec4) -> f32 {
    clamp255(color.w * UNORM16_TO_UNORM8)
}

/// Quantizes an LDR RGB endpoint pair directly.
///
/// This is the fallback representation, so it cannot fail. The decoded
/// format requires the component sum of endpoint 0 to not exceed that of
/// endpoint 1, and quantization can reorder close endpoints; when that
/// happens the endpoints are nudged apart (0 down, 1 up) until the decoded
/// sums are ordered again, trading precision for validity.
pub(crate) fn quantize_rgb(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 6] {
    let [r0, g0, b0] = scaled_rgb(color0).map(clamp255);
    let [r1, g1, b1] = scaled_rgb(color1).map(clamp255);

    let mut addon0 = 0.5f32;
    let mut addon1 = 0.5f32;
    let mut iters = 0;
    loop {
        let ri0 = tables.quantize_clamped(quant_level, trunc_i32(r0 + addon0));
        let gi0 = tables.quantize_clamped(quant_level, trunc_i32(g0 + addon0));
        let bi0 = tables.quantize_clamped(quant_level, trunc_i32(b0 + addon0));
        let ri1 = tables.quantize_clamped(quant_level, trunc_i32(r1 + addon1));
        let gi1 = tables.quantize_clamped(quant_level, trunc_i32(g1 + addon1));
        let bi1 = tables.quantize_clamped(quant_level, trunc_i32(b1 + addon1));

        let sum0 = tables.unquantize(quant_level, ri0)
            + tables.unquantize(quant_level, gi0)
            + tables.unquantize(quant_level, bi0);
        let sum1 = tables.unquantize(quant_level, ri1)
            + tables.unquantize(quant_level, gi1)
            + tables.unquantize(quant_level, bi1);

        if sum0 <= sum1 || iters >= MAX_ORDER_ITERS {
            debug_assert!(sum0 <= sum1);
            return [
                ri0 as u8, ri1 as u8, gi0 as u8, gi1 as u8, bi0 as u8, bi1 as u8,
            ];
        }

        addon0 -= 0.2;
        addon1 += 0.2;
        iters += 1;
    }
}

/// Quantizes an LDR RGBA endpoint pair directly. Like [`quantize_rgb`],
/// this cannot fail; alpha has no ordering requirement.
pub(crate) fn quantize_rgba(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 8] {
    let ai0 = tables.quantize(quant_level, round_i32(scaled_alpha(color0)));
    let ai1 = tables.quantize(quant_level, round_i32(scaled_alpha(color1)));

    let [r0, r1, g0, g1, b0, b1] = quantize_rgb(color0, color1, quant_level, tables);
    [r0, r1, g0, g1, b0, b1, ai0 as u8, ai1 as u8]
}

/// Applies the inverse blue-contraction `(r, g, b) -> (2r - b, 2g - b, b)`
/// to both endpoints. Returns `None` when any transformed component leaves
/// the `[0, 255]` domain.
fn inverse_blue_contract(c0: [f32; 3], c1: [f32; 3]) -> Option<([f32; 3], [f32; 3])> {
    let [r0, g0, b0] = c0;
    let [r1, g1, b1] = c1;
    let c0 = [r0 + (r0 - b0), g0 + (g0 - b0), b0];
    let c1 = [r1 + (r1 - b1), g1 + (g1 - b1), b1];

    let in_range = |v: &f32| (0.0..=255.0).contains(v);
    if c0.iter().all(in_range) && c1.iter().all(in_range) {
        Some((c0, c1))
    } else {
        None
    }
}

/// Attempts to quantize an RGB endpoint pair in blue-contracted form.
///
/// The stored endpoints are swapped, which is how a decoder recognizes the
/// transform: it sees endpoint 0 decode to a larger component sum than
/// endpoint 1. If quantization does not leave endpoint 1 strictly larger,
/// the representation is ambiguous and the attempt fails.
pub(crate) fn try_quantize_rgb_blue_contract(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 6]> {
    let (c0, c1) = inverse_blue_contract(scaled_rgb(color0), scaled_rgb(color1))?;

    let [ri0, gi0, bi0] = c0.map(|v| tables.quantize(quant_level, round_i32(v)));
    let [ri1, gi1, bi1] = c1.map(|v| tables.quantize(quant_level, round_i32(v)));

    let sum0 = tables.unquantize(quant_level, ri0)
        + tables.unquantize(quant_level, gi0)
        + tables.unquantize(quant_level, bi0);
    let sum1 = tables.unquantize(quant_level, ri1)
        + tables.unquantize(quant_level, gi1)
        + tables.unquantize(quant_level, bi1);
    if sum1 <= sum0 {
        return None;
    }

    Some([
        ri1 as u8, ri0 as u8, gi1 as u8, gi0 as u8, bi1 as u8, bi0 as u8,
    ])
}

pub(crate) fn try_quantize_rgba_blue_contract(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 8]> {
    let ai0 = tables.quantize(quant_level, round_i32(scaled_alpha(color0)));
    let ai1 = tables.quantize(quant_level, round_i32(scaled_alpha(color1)));

    let [r0, r1, g0, g1, b0, b1] =
        try_quantize_rgb_blue_contract(color0, color1, quant_level, tables)?;
    // alpha endpoints swap along with the color endpoints
    Some([r0, r1, g0, g1, b0, b1, ai1 as u8, ai0 as u8])
}

// Delta encoding stores endpoint 0 as a 9-bit base and endpoint 1 as a
// 7-bit signed offset from it. The decoder moves one bit from the offset
// byte back to the base and seizes another as the offset's sign bit, so
// both the base's top bit and the offset's sign bit must survive the
// quantization round trip verbatim.

struct Unorm9Base {
    /// The quantized index emitted for the base.
    index: i32,
    /// The 9-bit reconstruction differences are taken against.
    value: i32,
}

fn quantize_unorm9_base(v: f32, quant_level: usize, tables: &ColorQuantTables) -> Unorm9Base {
    let wide = round_i32(v) << 1;
    let (index, reconstruction) = tables.round_trip(quant_level, wide & 0xFF);
    Unorm9Base {
        index,
        value: reconstruction | (wide & 0x100),
    }
}

/// Packs endpoint 1's channel as an offset from `base`. Returns the
/// quantized index and the offset a decoder would reconstruct, or `None`
/// when the offset is out of range or the round trip corrupts the base's
/// top bit or the offset's sign bit.
fn quantize_unorm9_offset(
    v: f32,
    base: i32,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<(i32, i32)> {
    let diff = (round_i32(v) << 1) - base;
    if !(-64..=63).contains(&diff) {
        return None;
    }

    // low 7 bits carry the offset, bit 7 re-carries the base's top bit
    let packed = (diff & 0x7F) | ((base & 0x100) >> 1);
    let (index, reconstruction) = tables.round_trip(quant_level, packed);
    if ((packed ^ reconstruction) & 0xC0) != 0 {
        return None;
    }

    let mut decoded = reconstruction & 0x7F;
    if decoded & 0x40 != 0 {
        decoded -= 0x80;
    }
    Some((index, decoded))
}

/// Which sign the decoded offset sum must have. A decoder reads a
/// non-negative sum as plain delta and a negative sum as blue-contracted
/// delta, so each variant must reject candidates that would decode as the
/// other.
#[derive(Clone, Copy, PartialEq)]
enum OffsetSum {
    NonNegative,
    Negative,
}

fn try_quantize_rgb_delta_channels(
    c0: [f32; 3],
    c1: [f32; 3],
    required_sum: OffsetSum,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 6]> {
    let r = quantize_unorm9_base(c0[0], quant_level, tables);
    let g = quantize_unorm9_base(c0[1], quant_level, tables);
    let b = quantize_unorm9_base(c0[2], quant_level, tables);

    let (ri1, rd) = quantize_unorm9_offset(c1[0], r.value, quant_level, tables)?;
    let (gi1, gd) = quantize_unorm9_offset(c1[1], g.value, quant_level, tables)?;
    let (bi1, bd) = quantize_unorm9_offset(c1[2], b.value, quant_level, tables)?;

    let sum = rd + gd + bd;
    let sum_ok = match required_sum {
        OffsetSum::NonNegative => sum >= 0,
        OffsetSum::Negative => sum < 0,
    };
    if !sum_ok {
        return None;
    }

    // the decoded endpoint 1 must stay inside the 9-bit domain
    for (base, offset) in [(&r, rd), (&g, gd), (&b, bd)] {
        if !(0..=0x1FF).contains(&(base.value + offset)) {
            return None;
        }
    }

    Some([
        r.index as u8,
        ri1 as u8,
        g.index as u8,
        gi1 as u8,
        b.index as u8,
        bi1 as u8,
    ])
}

/// Attempts a delta encoding of an RGB endpoint pair.
pub(crate) fn try_quantize_rgb_delta(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 6]> {
    let c0 = scaled_rgb(color0).map(clamp255);
    let c1 = scaled_rgb(color1).map(clamp255);
    try_quantize_rgb_delta_channels(c0, c1, OffsetSum::NonNegative, quant_level, tables)
}

/// Attempts a delta encoding of the blue-contracted endpoint pair. The
/// endpoints swap roles up front (blue contraction reverses their order),
/// and the decoded offset sum must be negative where the plain variant
/// requires it non-negative.
pub(crate) fn try_quantize_rgb_delta_blue_contract(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 6]> {
    let (c0, c1) = inverse_blue_contract(scaled_rgb(color1), scaled_rgb(color0))?;
    try_quantize_rgb_delta_channels(c0, c1, OffsetSum::Negative, quant_level, tables)
}

/// Attempts a delta encoding of the alpha channel alone. Returns the two
/// alpha slots `[A0, A1]`.
pub(crate) fn try_quantize_alpha_delta(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 2]> {
    let base = quantize_unorm9_base(scaled_alpha(color0), quant_level, tables);
    let (index, offset) = quantize_unorm9_offset(scaled_alpha(color1), base.value, quant_level, tables)?;
    if !(0..=0x1FF).contains(&(base.value + offset)) {
        return None;
    }
    Some([base.index as u8, index as u8])
}

pub(crate) fn try_quantize_rgba_delta(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 8]> {
    let [a0, a1] = try_quantize_alpha_delta(color0, color1, quant_level, tables)?;
    let [r0, r1, g0, g1, b0, b1] = try_quantize_rgb_delta(color0, color1, quant_level, tables)?;
    Some([r0, r1, g0, g1, b0, b1, a0, a1])
}

pub(crate) fn try_quantize_rgba_delta_blue_contract(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 8]> {
    // blue contraction swaps the endpoints, so alpha swaps with them
    let [a0, a1] = try_quantize_alpha_delta(color1, color0, quant_level, tables)?;
    let [r0, r1, g0, g1, b0, b1] =
        try_quantize_rgb_delta_blue_contract(color0, color1, quant_level, tables)?;
    Some([r0, r1, g0, g1, b0, b1, a0, a1])
}

/// Attempts a delta encoding of luminance and alpha. Returns
/// `[L0, L1, A0, A1]`.
pub(crate) fn try_quantize_luminance_alpha_delta(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 4]> {
    let l0 = clamp255((color0.x + color0.y + color0.z) * (UNORM16_TO_UNORM8 / 3.0));
    let l1 = clamp255((color1.x + color1.y + color1.z) * (UNORM16_TO_UNORM8 / 3.0));

    let lum = quantize_unorm9_base(l0, quant_level, tables);
    let alpha = quantize_unorm9_base(scaled_alpha(color0), quant_level, tables);
    let (li1, ld) = quantize_unorm9_offset(l1, lum.value, quant_level, tables)?;
    let (ai1, ad) = quantize_unorm9_offset(scaled_alpha(color1), alpha.value, quant_level, tables)?;

    if !(0..=0x1FF).contains(&(lum.value + ld)) || !(0..=0x1FF).contains(&(alpha.value + ad)) {
        return None;
    }
    Some([lum.index as u8, li1 as u8, alpha.index as u8, ai1 as u8])
}

/// Quantizes the luminance of both endpoints. Reversed endpoints collapse
/// to their average, which keeps the decoded pair ordered.
pub(crate) fn quantize_luminance(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 2] {
    let [r0, g0, b0] = scaled_rgb(color0);
    let [r1, g1, b1] = scaled_rgb(color1);
    let mut lum0 = clamp255((r0 + g0 + b0) * (1.0 / 3.0));
    let mut lum1 = clamp255((r1 + g1 + b1) * (1.0 / 3.0));

    if lum0 > lum1 {
        let avg = (lum0 + lum1) * 0.5;
        lum0 = avg;
        lum1 = avg;
    }

    [
        tables.quantize(quant_level, round_i32(lum0)) as u8,
        tables.quantize(quant_level, round_i32(lum1)) as u8,
    ]
}

/// Spreads two nearly equal values apart by half a unit each, preserving
/// their order. At the top quantization levels this recovers better than
/// 8-bit precision for slowly varying channels (normal maps in particular).
fn spread_apart(v0: &mut f32, v1: &mut f32) {
    if *v0 < *v1 {
        *v0 -= 0.5;
        *v1 += 0.5;
    } else {
        *v0 += 0.5;
        *v1 -= 0.5;
    }
    *v0 = clamp255(*v0);
    *v1 = clamp255(*v1);
}

pub(crate) fn quantize_luminance_alpha(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 4] {
    let [r0, g0, b0] = scaled_rgb(color0);
    let [r1, g1, b1] = scaled_rgb(color1);
    let mut lum0 = clamp255((r0 + g0 + b0) * (1.0 / 3.0));
    let mut lum1 = clamp255((r1 + g1 + b1) * (1.0 / 3.0));
    let mut a0 = scaled_alpha(color0);
    let mut a1 = scaled_alpha(color1);

    if quant_level > 18 && (lum0 - lum1).abs() < 3.0 {
        spread_apart(&mut lum0, &mut lum1);
    }
    if quant_level > 18 && (a0 - a1).abs() < 3.0 {
        spread_apart(&mut a0, &mut a1);
    }

    [
        tables.quantize(quant_level, round_i32(lum0)) as u8,
        tables.quantize(quant_level, round_i32(lum1)) as u8,
        tables.quantize(quant_level, round_i32(a0)) as u8,
        tables.quantize(quant_level, round_i32(a1)) as u8,
    ]
}

/// Quantizes an RGB color with a separate scale factor, `[R, G, B, S]`.
///
/// `rgbs_color` holds the chromatic base in RGB and the desired scale in
/// the alpha slot (range `[0, 1]`). The emitted scale compensates for the
/// quantization error of the base so the scaled endpoint lands where the
/// caller asked.
pub(crate) fn quantize_rgb_scale(
    rgbs_color: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 4] {
    let [rs, gs, bs] = scaled_rgb(rgbs_color);

    let (ri, ru) = tables.round_trip(quant_level, round_i32(clamp255(rs)));
    let (gi, gu) = tables.round_trip(quant_level, round_i32(clamp255(gs)));
    let (bi, bu) = tables.round_trip(quant_level, round_i32(clamp255(bs)));

    let old_sum = rs + gs + bs;
    let new_sum = (ru + gu + bu) as f32;
    let scale = (rgbs_color.w * (old_sum + 1e-10) / (new_sum + 1e-10)).clamp(0.0, 1.0);
    let scale_idx = round_i32(scale * 256.0).clamp(0, 255);

    [
        ri as u8,
        gi as u8,
        bi as u8,
        tables.quantize(quant_level, scale_idx) as u8,
    ]
}

/// RGB + scale with explicit alpha endpoints, `[R, G, B, S, A0, A1]`.
pub(crate) fn quantize_rgb_scale_alpha(
    color0: Vec4,
    color1: Vec4,
    rgbs_color: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 6] {
    let ai0 = tables.quantize(quant_level, round_i32(scaled_alpha(color0)));
    let ai1 = tables.quantize(quant_level, round_i32(scaled_alpha(color1)));

    let [r, g, b, s] = quantize_rgb_scale(rgbs_color, quant_level, tables);
    [r, g, b, s, ai0 as u8, ai1 as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::testing::{identity_tables, ranged_tables};
    use crate::quant::QUANT_LEVELS;

    fn gray(v: f32) -> Vec4 {
        Vec4::new(v, v, v, 65535.0)
    }

    fn decode_offset_sum(output: &[u8; 6], tables: &ColorQuantTables, quant_level: usize) -> i32 {
        let mut sum = 0;
        for i in [1, 3, 5] {
            let mut d = tables.unquantize(quant_level, output[i] as i32) & 0x7F;
            if d & 0x40 != 0 {
                d -= 0x80;
            }
            sum += d;
        }
        sum
    }

    #[test]
    fn direct_rgb_restores_sum_order() {
        let tables = ranged_tables();
        for level in 0..QUANT_LEVELS {
            // reversed pair forces the nudging loop to run
            let out = quantize_rgb(gray(65535.0), gray(0.0), level, &tables);
            let sum = |i0: usize, i1: usize, i2: usize| {
                tables.unquantize(level, out[i0] as i32)
                    + tables.unquantize(level, out[i1] as i32)
                    + tables.unquantize(level, out[i2] as i32)
            };
            assert!(sum(0, 2, 4) <= sum(1, 3, 5), "level {level}");
        }
    }

    #[test]
    fn direct_rgb_is_exact_with_identity_tables() {
        let tables = identity_tables();
        let out = quantize_rgb(
            Vec4::new(25700.0, 12850.0, 0.0, 65535.0),
            Vec4::new(51400.0, 25700.0, 12850.0, 65535.0),
            20,
            &tables,
        );
        assert_eq!(out, [100, 200, 50, 100, 0, 50]);
    }

    #[test]
    fn delta_offset_sum_signs() {
        let tables = identity_tables();
        // deterministic sweep over ordered pairs of gray endpoints
        for v0 in (0..=65535).step_by(4369) {
            for v1 in (0..=65535).step_by(4369) {
                let c0 = gray(v0 as f32);
                let c1 = gray(v1 as f32);
                if let Some(out) = try_quantize_rgb_delta(c0, c1, 10, &tables) {
                    assert!(decode_offset_sum(&out, &tables, 10) >= 0, "{v0} {v1}");
                }
                if let Some(out) = try_quantize_rgb_delta_blue_contract(c0, c1, 10, &tables) {
                    assert!(decode_offset_sum(&out, &tables, 10) < 0, "{v0} {v1}");
                }
            }
        }
    }

    #[test]
    fn delta_rejects_wide_pairs() {
        let tables = identity_tables();
        // a spread of more than 32 unorm8 units cannot fit the 7-bit offset
        assert!(try_quantize_rgb_delta(gray(0.0), gray(65535.0), 10, &tables).is_none());
        assert!(try_quantize_alpha_delta(gray(0.0), gray(65535.0), 10, &tables).is_none());
    }

    #[test]
    fn blue_contract_rejects_overflow() {
        let tables = identity_tables();
        // r doubles to ~510 under the inverse transform
        let c0 = Vec4::new(65535.0, 65535.0, 0.0, 65535.0);
        let c1 = Vec4::new(65535.0, 65535.0, 0.0, 65535.0);
        assert!(try_quantize_rgb_blue_contract(c0, c1, 10, &tables).is_none());
    }

    #[test]
    fn blue_contract_swaps_endpoints() {
        let tables = identity_tables();
        let out = try_quantize_rgb_blue_contract(gray(0.0), gray(25700.0), 10, &tables).unwrap();
        // endpoint 1 is stored first; gray survives the transform unchanged
        assert_eq!(out, [100, 0, 100, 0, 100, 0]);
    }

    #[test]
    fn luminance_alpha_spread_at_top_levels() {
        let tables = identity_tables();
        let c0 = Vec4::new(25700.0, 25700.0, 25700.0, 32896.0);
        let c1 = Vec4::new(25957.0, 25957.0, 25957.0, 32896.0);
        assert_eq!(
            quantize_luminance_alpha(c0, c1, 20, &tables),
            [100, 102, 129, 128]
        );
        // below level 19 the endpoints quantize as given
        assert_eq!(
            quantize_luminance_alpha(c0, c1, 18, &tables),
            [100, 101, 128, 128]
        );
    }

    #[test]
    fn rgb_scale_compensates_quantization_error() {
        let tables = identity_tables();
        let out = quantize_rgb_scale(Vec4::new(25700.0, 25700.0, 25700.0, 1.0), 20, &tables);
        assert_eq!(out, [100, 100, 100, 255]);
    }
}

use glam::{Vec4, Vec4Swizzles};

use super::round_i32;
use crate::quant::ColorQuantTables;

const LNS_MAX: f32 = 65535.0;

/// Index of the largest of the first three components.
fn majority_component(color: Vec4) -> usize {
    if color.x > color.y && color.x > color.z {
        0
    } else if color.y > color.z {
        1
    } else {
        2
    }
}

/// Swaps the majority component into the red slot.
fn swap_to_red(color: Vec4, majcomp: usize) -> Vec4 {
    match majcomp {
        1 => color.yxzw(),
        2 => color.zyxw(),
        _ => color,
    }
}

// The HDR encodings smuggle their mode id and the high-order bits of wide
// fields through the top bits of the quantized bytes. Which source bit
// lands in which byte is irregular and differs per sub-mode, so the
// placement is spelled out as (field, shift) tables below rather than
// branching per mode.

#[derive(Clone, Copy)]
enum RgboField {
    R,
    G,
    B,
    S,
}

#[inline]
fn rgbo_bit(src: (RgboField, u32), r: i32, g: i32, b: i32, s: i32) -> i32 {
    let (field, shift) = src;
    let v = match field {
        RgboField::R => r,
        RgboField::G => g,
        RgboField::B => b,
        RgboField::S => s,
    };
    (v >> shift) & 1
}

/// Field bit widths (R, G/B, S) per RGB+scale sub-mode.
const RGBO_MODE_BITS: [[u32; 3]; 5] = [
    [11, 5, 7],
    [11, 6, 5],
    [10, 5, 8],
    [9, 6, 7],
    [8, 7, 6],
];

/// Feasibility cutoffs (G/B, S) per RGB+scale sub-mode.
const RGBO_CUTOFFS: [[f32; 2]; 5] = [
    [1024.0, 4096.0],
    [2048.0, 1024.0],
    [2048.0, 16384.0],
    [8192.0, 16384.0],
    [32768.0, 16384.0],
];

/// Reconstruction scale per RGB+scale sub-mode; the forward scale is its
/// reciprocal (all powers of two).
const RGBO_RSCALES: [f32; 5] = [32.0, 32.0, 64.0, 128.0, 256.0];

/// High-bit sources packed into the G and B bytes, per sub-mode:
/// G bit 6, G bit 5, B bit 6, B bit 5.
const RGBO_GB_BITS: [[(RgboField, u32); 4]; 5] = {
    use RgboField::*;
    [
        [(R, 9), (R, 8), (R, 7), (R, 10)],
        [(R, 8), (G, 5), (R, 7), (B, 5)],
        [(R, 9), (R, 8), (R, 7), (R, 6)],
        [(R, 8), (G, 5), (R, 7), (B, 5)],
        [(G, 6), (G, 5), (B, 6), (B, 5)],
    ]
};

/// High-bit sources packed into the scale byte, per sub-mode:
/// S bit 7, S bit 6, S bit 5.
const RGBO_S_BITS: [[(RgboField, u32); 3]; 5] = {
    use RgboField::*;
    [
        [(R, 6), (S, 6), (S, 5)],
        [(R, 6), (R, 10), (R, 9)],
        [(S, 7), (S, 6), (S, 5)],
        [(R, 6), (S, 6), (S, 5)],
        [(R, 6), (R, 7), (S, 5)],
    ]
};

/// Quantizes an HDR RGB color plus scale offset into `[R, G, B, S]`.
///
/// The scale in the alpha slot is first added onto all three channels
/// (the stored model is base + offset), the majority component is swapped
/// into the red slot, and the five sub-modes are tried in order of
/// decreasing R precision. G and B are stored as differences from the
/// reconstructed R, and the scale is re-derived last so that the
/// quantization error of R, G and B is folded back into it. A flat
/// low-precision encoding covers inputs no sub-mode can represent.
pub(crate) fn quantize_hdr_rgb_scale(
    color: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 4] {
    let color = Vec4::new(
        color.x + color.w,
        color.y + color.w,
        color.z + color.w,
        color.w,
    )
    .clamp(Vec4::ZERO, Vec4::splat(LNS_MAX));

    let color_bak = color;
    let majcomp = majority_component(color);
    let color = swap_to_red(color, majcomp);

    let r_base = color.x;
    let g_base = color.x - color.y;
    let b_base = color.x - color.z;
    let s_base = color.w;

    for mode in 0..5 {
        let [gb_cutoff, s_cutoff] = RGBO_CUTOFFS[mode];
        if g_base > gb_cutoff || b_base > gb_cutoff || s_base > s_cutoff {
            continue;
        }

        let mode_enc = if mode < 4 {
            mode as i32 | ((majcomp as i32) << 2)
        } else {
            majcomp as i32 | 0xC
        };

        let mode_rscale = RGBO_RSCALES[mode];
        let mode_scale = 1.0 / mode_rscale;
        let gb_intcutoff = 1i32 << RGBO_MODE_BITS[mode][1];
        let s_intcutoff = 1i32 << RGBO_MODE_BITS[mode][2];

        // R carries the low two mode bits in its top bits
        let mut r_intval = round_i32(r_base * mode_scale);
        let r_lowbits = (r_intval & 0x3F) | ((mode_enc & 3) << 6);
        let (r_quant, r_unquant) = tables.round_trip_retaining(quant_level, r_lowbits, 0xC0);
        r_intval = (r_intval & !0x3F) | (r_unquant & 0x3F);
        let r_fval = r_intval as f32 * mode_rscale;

        // G and B are differences against the reconstructed R
        let g_fval = (r_fval - color.y).clamp(0.0, LNS_MAX);
        let b_fval = (r_fval - color.z).clamp(0.0, LNS_MAX);
        let g_intval = round_i32(g_fval * mode_scale);
        let b_intval = round_i32(b_fval * mode_scale);
        if g_intval >= gb_intcutoff || b_intval >= gb_intcutoff {
            continue;
        }

        let gb_bits =
            RGBO_GB_BITS[mode].map(|src| rgbo_bit(src, r_intval, g_intval, b_intval, 0));
        let g_lowbits = (g_intval & 0x1F)
            | ((mode_enc & 0x4) << 5)
            | (gb_bits[0] << 6)
            | (gb_bits[1] << 5);
        let b_lowbits = (b_intval & 0x1F)
            | ((mode_enc & 0x8) << 4)
            | (gb_bits[2] << 6)
            | (gb_bits[3] << 5);

        let (g_quant, g_unquant) = tables.round_trip_retaining(quant_level, g_lowbits, 0xF0);
        let (b_quant, b_unquant) = tables.round_trip_retaining(quant_level, b_lowbits, 0xF0);
        let g_intval = (g_intval & !0x1F) | (g_unquant & 0x1F);
        let b_intval = (b_intval & !0x1F) | (b_unquant & 0x1F);
        let g_fval = g_intval as f32 * mode_rscale;
        let b_fval = b_intval as f32 * mode_rscale;

        // a positive combined error means the reconstruction came out
        // brighter than asked; raise the scale to match
        let rgb_errorsum =
            (r_fval - color.x) + (r_fval - g_fval - color.y) + (r_fval - b_fval - color.z);
        let s_fval = (s_base + rgb_errorsum * (1.0 / 3.0)).clamp(0.0, 1e9);
        let s_intval = round_i32(s_fval * mode_scale);
        if s_intval >= s_intcutoff {
            continue;
        }

        let s_bits =
            RGBO_S_BITS[mode].map(|src| rgbo_bit(src, r_intval, g_intval, b_intval, s_intval));
        let s_lowbits =
            (s_intval & 0x1F) | (s_bits[0] << 7) | (s_bits[1] << 6) | (s_bits[2] << 5);
        let (s_quant, _) = tables.round_trip_retaining(quant_level, s_lowbits, 0xF0);

        return [r_quant as u8, g_quant as u8, b_quant as u8, s_quant as u8];
    }

    // No sub-mode fit: flat encoding at 1/512 scale with fixed prefixes.
    let mut vals = [color_bak.x, color_bak.y, color_bak.z, color_bak.w];
    let mut ivals = [0i32; 4];
    let mut cvals = [0f32; 3];
    for i in 0..3 {
        vals[i] = vals[i].clamp(0.0, 65020.0);
        ivals[i] = round_i32(vals[i] * (1.0 / 512.0));
        cvals[i] = ivals[i] as f32 * 512.0;
    }

    let rgb_errorsum = (cvals[0] - vals[0]) + (cvals[1] - vals[1]) + (cvals[2] - vals[2]);
    vals[3] = (vals[3] + rgb_errorsum * (1.0 / 3.0)).clamp(0.0, 65020.0);
    ivals[3] = round_i32(vals[3] * (1.0 / 512.0));

    let encvals = [
        (ivals[0] & 0x3F) | 0xC0,
        (ivals[1] & 0x7F) | 0x80,
        (ivals[2] & 0x7F) | 0x80,
        (ivals[3] & 0x7F) | ((ivals[0] & 0x40) << 1),
    ];

    let mut output = [0u8; 4];
    for i in 0..4 {
        let (quant, _) = tables.round_trip_retaining(quant_level, encvals[i], 0xF0);
        output[i] = quant as u8;
    }
    output
}

#[derive(Clone, Copy)]
enum RgbField {
    A,
    B0,
    B1,
    C,
    D0,
    D1,
}

#[inline]
fn hdr_rgb_bit(src: (RgbField, u32), a: i32, b0: i32, b1: i32, c: i32, d0: i32, d1: i32) -> i32 {
    let (field, shift) = src;
    let v = match field {
        RgbField::A => a,
        RgbField::B0 => b0,
        RgbField::B1 => b1,
        RgbField::C => c,
        RgbField::D0 => d0,
        RgbField::D1 => d1,
    };
    (v >> shift) & 1
}

/// Field bit widths (A, B, C, D) per two-endpoint sub-mode.
const HDR_RGB_MODE_BITS: [[u32; 4]; 8] = [
    [9, 7, 6, 7],
    [9, 8, 6, 6],
    [10, 6, 7, 7],
    [10, 7, 7, 6],
    [11, 8, 6, 5],
    [11, 6, 8, 6],
    [12, 7, 7, 5],
    [12, 6, 7, 6],
];

/// Feasibility cutoffs (B, C, |D|) per two-endpoint sub-mode, assuming
/// `[0, 65535]` LNS inputs.
const HDR_RGB_CUTOFFS: [[f32; 3]; 8] = [
    [16384.0, 8192.0, 8192.0],
    [32768.0, 8192.0, 4096.0],
    [4096.0, 8192.0, 4096.0],
    [8192.0, 8192.0, 2048.0],
    [8192.0, 2048.0, 512.0],
    [2048.0, 8192.0, 1024.0],
    [2048.0, 2048.0, 256.0],
    [1024.0, 2048.0, 512.0],
];

/// Reconstruction scale per two-endpoint sub-mode.
const HDR_RGB_RSCALES: [f32; 8] = [128.0, 128.0, 64.0, 64.0, 32.0, 32.0, 16.0, 16.0];

/// High-bit sources packed into the B0 and B1 bytes, per sub-mode:
/// B0 bit 6, B1 bit 6.
const HDR_RGB_B_BITS: [[(RgbField, u32); 2]; 8] = {
    use RgbField::*;
    [
        [(B0, 6), (B1, 6)],
        [(B0, 6), (B1, 6)],
        [(A, 9), (C, 6)],
        [(B0, 6), (B1, 6)],
        [(B0, 6), (B1, 6)],
        [(A, 9), (A, 10)],
        [(B0, 6), (B1, 6)],
        [(A, 9), (A, 10)],
    ]
};

/// High-bit sources packed into the D0 and D1 bytes, per sub-mode:
/// D0 bit 6, D1 bit 6, D0 bit 5, D1 bit 5.
const HDR_RGB_D_BITS: [[(RgbField, u32); 4]; 8] = {
    use RgbField::*;
    [
        [(D0, 6), (D1, 6), (D0, 5), (D1, 5)],
        [(B0, 7), (B1, 7), (D0, 5), (D1, 5)],
        [(D0, 6), (D1, 6), (D0, 5), (D1, 5)],
        [(A, 9), (C, 6), (D0, 5), (D1, 5)],
        [(B0, 7), (B1, 7), (A, 9), (A, 10)],
        [(C, 7), (C, 6), (D0, 5), (D1, 5)],
        [(A, 11), (C, 6), (A, 9), (A, 10)],
        [(A, 11), (C, 6), (D0, 5), (D1, 5)],
    ]
};

/// Quantizes two HDR RGB endpoints into `[A, C, B0, B1, D0, D1]`.
///
/// The majority component of the *high* endpoint is swapped into the red
/// slot of both endpoints, and the pair is re-expressed as five derived
/// fields: `A` (high red), `B0`/`B1` (high green/blue as differences from
/// `A`), `C` (the red span) and `D0`/`D1` (signed residuals of the low
/// green/blue). Sub-modes are tried from 7 (highest precision) down to 0;
/// each field is re-derived from the previous field's reconstruction
/// before being quantized itself, so errors do not accumulate across
/// fields.
pub(crate) fn quantize_hdr_rgb(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 6] {
    let color0 = color0.clamp(Vec4::ZERO, Vec4::splat(LNS_MAX));
    let color1 = color1.clamp(Vec4::ZERO, Vec4::splat(LNS_MAX));

    let color0_bak = color0;
    let color1_bak = color1;

    let majcomp = majority_component(color1);
    let color0 = swap_to_red(color0, majcomp);
    let color1 = swap_to_red(color1, majcomp);
    let majcomp = majcomp as i32;

    let a_base = color1.x.clamp(0.0, LNS_MAX);
    let b0_base = a_base - color1.y;
    let b1_base = a_base - color1.z;
    let c_base = a_base - color0.x;
    let d0_base = a_base - b0_base - c_base - color0.y;
    let d1_base = a_base - b1_base - c_base - color0.z;

    for mode in (0..8).rev() {
        let [b_cutoff, c_cutoff, d_cutoff] = HDR_RGB_CUTOFFS[mode];
        if b0_base > b_cutoff
            || b1_base > b_cutoff
            || c_base > c_cutoff
            || d0_base.abs() > d_cutoff
            || d1_base.abs() > d_cutoff
        {
            continue;
        }

        let mode_rscale = HDR_RGB_RSCALES[mode];
        let mode_scale = 1.0 / mode_rscale;
        let b_intcutoff = 1i32 << HDR_RGB_MODE_BITS[mode][1];
        let c_intcutoff = 1i32 << HDR_RGB_MODE_BITS[mode][2];
        let d_intcutoff = 1i32 << (HDR_RGB_MODE_BITS[mode][3] - 1);

        // A quantizes plainly; its bits above the byte pass through the
        // other fields' top bits instead
        let mut a_intval = round_i32(a_base * mode_scale);
        let (a_quant, a_unquant) = tables.round_trip(quant_level, a_intval & 0xFF);
        a_intval = (a_intval & !0xFF) | a_unquant;
        let a_fval = a_intval as f32 * mode_rscale;

        // C, re-derived from the reconstructed A
        let c_fval = (a_fval - color0.x).clamp(0.0, LNS_MAX);
        let mut c_intval = round_i32(c_fval * mode_scale);
        if c_intval >= c_intcutoff {
            continue;
        }
        let c_lowbits =
            (c_intval & 0x3F) | ((mode as i32 & 1) << 7) | ((a_intval & 0x100) >> 2);
        let (c_quant, c_unquant) = tables.round_trip_retaining(quant_level, c_lowbits, 0xC0);
        c_intval = (c_intval & !0x3F) | (c_unquant & 0x3F);
        let c_fval = c_intval as f32 * mode_rscale;

        // B0 and B1
        let b0_fval = (a_fval - color1.y).clamp(0.0, LNS_MAX);
        let b1_fval = (a_fval - color1.z).clamp(0.0, LNS_MAX);
        let mut b0_intval = round_i32(b0_fval * mode_scale);
        let mut b1_intval = round_i32(b1_fval * mode_scale);
        if b0_intval >= b_intcutoff || b1_intval >= b_intcutoff {
            continue;
        }

        let b_bits = HDR_RGB_B_BITS[mode]
            .map(|src| hdr_rgb_bit(src, a_intval, b0_intval, b1_intval, c_intval, 0, 0));
        let b0_lowbits = (b0_intval & 0x3F) | (b_bits[0] << 6) | (((mode as i32 >> 1) & 1) << 7);
        let b1_lowbits = (b1_intval & 0x3F) | (b_bits[1] << 6) | (((mode as i32 >> 2) & 1) << 7);

        let (b0_quant, b0_unquant) = tables.round_trip_retaining(quant_level, b0_lowbits, 0xC0);
        let (b1_quant, b1_unquant) = tables.round_trip_retaining(quant_level, b1_lowbits, 0xC0);
        b0_intval = (b0_intval & !0x3F) | (b0_unquant & 0x3F);
        b1_intval = (b1_intval & !0x3F) | (b1_unquant & 0x3F);
        let b0_fval = b0_intval as f32 * mode_rscale;
        let b1_fval = b1_intval as f32 * mode_rscale;

        // D0 and D1, signed
        let d0_fval = (a_fval - b0_fval - c_fval - color0.y).clamp(-LNS_MAX, LNS_MAX);
        let d1_fval = (a_fval - b1_fval - c_fval - color0.z).clamp(-LNS_MAX, LNS_MAX);
        let d0_intval = round_i32(d0_fval * mode_scale);
        let d1_intval = round_i32(d1_fval * mode_scale);
        if d0_intval.abs() >= d_intcutoff || d1_intval.abs() >= d_intcutoff {
            continue;
        }

        let d_bits = HDR_RGB_D_BITS[mode].map(|src| {
            hdr_rgb_bit(src, a_intval, b0_intval, b1_intval, c_intval, d0_intval, d1_intval)
        });
        let d0_lowbits =
            (d0_intval & 0x1F) | (d_bits[0] << 6) | (d_bits[2] << 5) | ((majcomp & 1) << 7);
        let d1_lowbits =
            (d1_intval & 0x1F) | (d_bits[1] << 6) | (d_bits[3] << 5) | (((majcomp >> 1) & 1) << 7);

        let (d0_quant, _) = tables.round_trip_retaining(quant_level, d0_lowbits, 0xF0);
        let (d1_quant, _) = tables.round_trip_retaining(quant_level, d1_lowbits, 0xF0);

        return [
            a_quant as u8,
            c_quant as u8,
            b0_quant as u8,
            b1_quant as u8,
            d0_quant as u8,
            d1_quant as u8,
        ];
    }

    // No sub-mode fit (the endpoints span more than the derived fields can
    // express): flat encoding, 8 bits for the red and green endpoints and
    // 7 for blue. Roughly LDR 4:4:3 accuracy, but always representable.
    let vals = [
        color0_bak.x,
        color1_bak.x,
        color0_bak.y,
        color1_bak.y,
        color0_bak.z,
        color1_bak.z,
    ]
    .map(|v| v.clamp(0.0, 65020.0));

    let mut output = [0u8; 6];
    for i in 0..4 {
        output[i] = tables.quantize(quant_level, round_i32(vals[i] * (1.0 / 256.0))) as u8;
    }
    for i in 4..6 {
        let idx = round_i32(vals[i] * (1.0 / 512.0)) + 128;
        let (quant, _) = tables.round_trip_retaining(quant_level, idx, 0xC0);
        output[i] = quant as u8;
    }
    output
}

/// HDR RGB endpoints with LDR alpha endpoints, `[A, C, B0, B1, D0, D1, A0, A1]`.
pub(crate) fn quantize_hdr_rgb_ldr_alpha(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 8] {
    let a0 = (color0.w * (1.0 / 257.0)).clamp(0.0, 255.0);
    let a1 = (color1.w * (1.0 / 257.0)).clamp(0.0, 255.0);
    let ai0 = tables.quantize(quant_level, round_i32(a0));
    let ai1 = tables.quantize(quant_level, round_i32(a1));

    let [a, c, b0, b1, d0, d1] = quantize_hdr_rgb(color0, color1, quant_level, tables);
    [a, c, b0, b1, d0, d1, ai0 as u8, ai1 as u8]
}

/// HDR RGB endpoints with HDR alpha endpoints.
pub(crate) fn quantize_hdr_rgba(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 8] {
    let [a, c, b0, b1, d0, d1] = quantize_hdr_rgb(color0, color1, quant_level, tables);
    let [a0, a1] = quantize_hdr_alpha(color0.w, color1.w, quant_level, tables);
    [a, c, b0, b1, d0, d1, a0, a1]
}

/// Attempts the small-range HDR luminance encoding.
///
/// Two sub-modes: an 11-bit base with a 4-bit delta, then a 10-bit base
/// with a 5-bit delta. Each sub-mode's discriminator bits must survive the
/// quantization round trip or the next one is tried. Fails outright when
/// the endpoints are more than a factor of two apart.
pub(crate) fn try_quantize_hdr_luminance_small_range(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> Option<[u8; 2]> {
    let mut lum0 = (color0.x + color0.y + color0.z) * (1.0 / 3.0);
    let mut lum1 = (color1.x + color1.y + color1.z) * (1.0 / 3.0);

    if lum1 < lum0 {
        let avg = (lum0 + lum1) * 0.5;
        lum0 = avg;
        lum1 = avg;
    }

    let ilum0 = round_i32(lum0);
    let ilum1 = round_i32(lum1);

    if ilum1 - ilum0 > 2048 {
        return None;
    }

    // high-precision sub-mode: 11-bit base, 4-bit delta
    'high: {
        let mut lowval = ((ilum0 + 16) >> 5).clamp(0, 2047);
        let highval = ((ilum1 + 16) >> 5).clamp(0, 2047);

        let v0 = lowval & 0x7F;
        let (v0e, v0d) = tables.round_trip(quant_level, v0);
        if v0d & 0x80 == 0x80 {
            break 'high;
        }

        lowval = (lowval & !0x7F) | (v0d & 0x7F);
        let diff = highval - lowval;
        if !(0..=15).contains(&diff) {
            break 'high;
        }

        let v1 = ((lowval >> 3) & 0xF0) | diff;
        let (v1e, v1d) = tables.round_trip(quant_level, v1);
        if (v1d & 0xF0) != (v1 & 0xF0) {
            break 'high;
        }

        return Some([v0e as u8, v1e as u8]);
    }

    // low-precision sub-mode: 10-bit base, 5-bit delta
    let mut lowval = ((ilum0 + 32) >> 6).clamp(0, 1023);
    let highval = ((ilum1 + 32) >> 6).clamp(0, 1023);

    let v0 = (lowval & 0x7F) | 0x80;
    let (v0e, v0d) = tables.round_trip(quant_level, v0);
    if v0d & 0x80 == 0 {
        return None;
    }

    lowval = (lowval & !0x7F) | (v0d & 0x7F);
    let diff = highval - lowval;
    if !(0..=31).contains(&diff) {
        return None;
    }

    let v1 = ((lowval >> 2) & 0xE0) | diff;
    let (v1e, v1d) = tables.round_trip(quant_level, v1);
    if (v1d & 0xE0) != (v1 & 0xE0) {
        return None;
    }

    Some([v0e as u8, v1e as u8])
}

/// Quantizes HDR luminance endpoints over the full range.
///
/// The two endpoints can land in either the upper or the lower half of the
/// codepoint space (the halves decode with different offsets); both
/// placements are evaluated and the one with the smaller squared
/// reconstruction error wins.
pub(crate) fn quantize_hdr_luminance_large_range(
    color0: Vec4,
    color1: Vec4,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 2] {
    let mut lum0 = (color0.x + color0.y + color0.z) * (1.0 / 3.0);
    let mut lum1 = (color1.x + color1.y + color1.z) * (1.0 / 3.0);

    if lum1 < lum0 {
        let avg = (lum0 + lum1) * 0.5;
        lum0 = avg;
        lum1 = avg;
    }

    let ilum0 = round_i32(lum0);
    let ilum1 = round_i32(lum1);

    // closest encodable points in the upper half of the codepoint space
    let upper_v0 = ((ilum0 + 128) >> 8).clamp(0, 255);
    let upper_v1 = ((ilum1 + 128) >> 8).clamp(0, 255);

    // closest encodable points in the lower half
    let lower_v0 = ((ilum1 + 256) >> 8).clamp(0, 255);
    let lower_v1 = (ilum0 >> 8).clamp(0, 255);

    let upper0_diff = (upper_v0 << 8) - ilum0;
    let upper1_diff = (upper_v1 << 8) - ilum1;
    let lower0_diff = ((lower_v1 << 8) + 128) - ilum0;
    let lower1_diff = ((lower_v0 << 8) - 128) - ilum1;

    let upper_error = upper0_diff * upper0_diff + upper1_diff * upper1_diff;
    let lower_error = lower0_diff * lower0_diff + lower1_diff * lower1_diff;

    let (v0, v1) = if upper_error < lower_error {
        (upper_v0, upper_v1)
    } else {
        (lower_v0, lower_v1)
    };

    [
        tables.quantize(quant_level, v0) as u8,
        tables.quantize(quant_level, v1) as u8,
    ]
}

/// Masks that must survive the round trip per alpha delta sub-mode.
const HDR_ALPHA_TESTBITS: [i32; 3] = [0xE0, 0xF0, 0xF8];

/// Quantizes a pair of HDR alpha values into two slots.
///
/// Three base+delta sub-modes of decreasing precision are tried; if none
/// survives the round trip the values are stored flat at 1/512 scale.
pub(crate) fn quantize_hdr_alpha(
    alpha0: f32,
    alpha1: f32,
    quant_level: usize,
    tables: &ColorQuantTables,
) -> [u8; 2] {
    let alpha0 = alpha0.clamp(0.0, 65280.0);
    let alpha1 = alpha1.clamp(0.0, 65280.0);

    let ialpha0 = round_i32(alpha0);
    let ialpha1 = round_i32(alpha1);

    for i in (0..=2).rev() {
        let mut val0 = (ialpha0 + (128 >> i)) >> (8 - i);
        let val1 = (ialpha1 + (128 >> i)) >> (8 - i);

        let v6 = (val0 & 0x7F) | ((i & 1) << 7);
        let (v6e, v6d) = tables.round_trip(quant_level, v6);
        if (v6 ^ v6d) & 0x80 != 0 {
            continue;
        }

        val0 = (val0 & !0x7F) | (v6d & 0x7F);
        let diff = val1 - val0;
        let cutoff = 32 >> i;
        let mask = 2 * cutoff - 1;
        if diff < -cutoff || diff >= cutoff {
            continue;
        }

        let v7 = ((i & 2) << 6) | ((val0 >> 7) << (6 - i)) | (diff & mask);
        let (v7e, v7d) = tables.round_trip(quant_level, v7);
        if (v7 ^ v7d) & HDR_ALPHA_TESTBITS[i as usize] != 0 {
            continue;
        }

        return [v6e as u8, v7e as u8];
    }

    // flat fallback
    let val0 = (ialpha0 + 256) >> 9;
    let val1 = (ialpha1 + 256) >> 9;
    [
        tables.quantize(quant_level, val0 | 0x80) as u8,
        tables.quantize(quant_level, val1 | 0x80) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::testing::identity_tables;

    #[test]
    fn rgb_scale_picks_first_feasible_mode() {
        let tables = identity_tables();
        // offset 100 raises the base to (1100, 600, 300); mode 0 fits
        let out = quantize_hdr_rgb_scale(Vec4::new(1000.0, 500.0, 200.0, 100.0), 10, &tables);
        assert_eq!(out, [34, 15, 25, 3]);
    }

    #[test]
    fn rgb_scale_swaps_majority_component() {
        let tables = identity_tables();
        // green is the largest component, so the mode code carries majcomp 1
        let out = quantize_hdr_rgb_scale(Vec4::new(500.0, 1000.0, 200.0, 100.0), 10, &tables);
        // mode_enc = 0 | (1 << 2): the G byte carries mode_enc bit 2
        assert_eq!(out[1] & 0x80, 0x80);
    }

    #[test]
    fn two_endpoint_picks_highest_feasible_mode() {
        let tables = identity_tables();
        let out = quantize_hdr_rgb(
            Vec4::new(1000.0, 500.0, 200.0, 0.0),
            Vec4::new(4000.0, 2000.0, 800.0, 0.0),
            10,
            &tables,
        );
        assert_eq!(out, [63, 47, 160, 51, 105, 91]);
    }

    #[test]
    fn two_endpoint_flat_fallback() {
        let tables = identity_tables();
        // a span this wide fails every sub-mode's cutoffs
        let out = quantize_hdr_rgb(
            Vec4::new(0.0, 0.0, 0.0, 0.0),
            Vec4::new(65535.0, 65535.0, 65535.0, 0.0),
            20,
            &tables,
        );
        // red/green endpoints at 1/256, blue at 1/512 + 128 bias
        assert_eq!(out, [0, 254, 0, 254, 128, 255]);
    }

    #[test]
    fn luminance_small_range_equal_endpoints() {
        let tables = identity_tables();
        let gray = Vec4::new(100.0, 100.0, 100.0, 0.0);
        let out = try_quantize_hdr_luminance_small_range(gray, gray, 5, &tables).unwrap();
        assert_eq!(out, [3, 0]);
    }

    #[test]
    fn luminance_small_range_rejects_wide_pairs() {
        let tables = identity_tables();
        let out = try_quantize_hdr_luminance_small_range(
            Vec4::ZERO,
            Vec4::new(4096.0, 4096.0, 4096.0, 0.0),
            5,
            &tables,
        );
        assert!(out.is_none());
    }

    #[test]
    fn luminance_large_range_prefers_smaller_error() {
        let tables = identity_tables();
        let out = quantize_hdr_luminance_large_range(
            Vec4::ZERO,
            Vec4::new(4096.0, 4096.0, 4096.0, 0.0),
            20,
            &tables,
        );
        // both luminances sit exactly on upper-half codepoints
        assert_eq!(out, [0, 16]);
    }

    #[test]
    fn alpha_delta_sub_mode() {
        let tables = identity_tables();
        assert_eq!(quantize_hdr_alpha(1000.0, 1000.0, 10, &tables), [16, 128]);
    }
}

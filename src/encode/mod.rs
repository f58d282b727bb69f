use glam::Vec4;

use crate::format::EndpointFormat;
use crate::quant::{ColorQuantTables, QUANT_LEVELS};

mod hdr;
mod ldr;

/// Round-to-nearest conversion. All inputs here are biased such that the
/// truncation after `+ 0.5` rounds as intended.
#[inline]
pub(crate) fn round_i32(x: f32) -> i32 {
    (x + 0.5) as i32
}

/// Truncating conversion. The direct RGB encoder depends on this rounding
/// down where every other conversion site rounds to nearest; the two must
/// not be mixed up, as they decide which quantization cell a borderline
/// value falls into.
#[inline]
pub(crate) fn trunc_i32(x: f32) -> i32 {
    x as i32
}

/// Packs a pair of color endpoints into quantized integer indices.
///
/// * `color0`, `color1` — the endpoints. LDR formats read them as
///   `[0, 65535]` fixed point (257 × unorm8); HDR formats read them as
///   `[0, 65535]` LNS values. Negative components are clamped to zero.
/// * `rgbs_color` — RGB base with a `[0, 1]` scale in the alpha slot; only
///   read by [`EndpointFormat::RgbScale`] and
///   [`EndpointFormat::RgbScaleAlpha`].
/// * `rgbo_color` — RGB base with an additive offset in the alpha slot;
///   only read by [`EndpointFormat::HdrRgbScale`].
/// * `format` — the requested endpoint format.
/// * `output` — receives one quantized index per channel slot; the first
///   `format.slot_count()` bytes are written, the rest is left untouched.
/// * `quant_level` — quantization level in `[0, 20]`.
/// * `tables` — the forward/inverse quantization tables.
///
/// Returns the format actually emitted. Delta-capable requests may come
/// back as their `Delta` counterpart, and the two HDR luminance requests
/// report whichever range representation was used; every other request
/// returns unchanged. There is no error path: each format family ends in
/// an encoder that cannot fail.
///
/// # Panics
///
/// Panics if `quant_level >= 21` or if `output` is shorter than
/// `format.slot_count()`.
pub fn pack_color_endpoints(
    color0: Vec4,
    color1: Vec4,
    rgbs_color: Vec4,
    rgbo_color: Vec4,
    format: EndpointFormat,
    output: &mut [u8],
    quant_level: usize,
    tables: &ColorQuantTables,
) -> EndpointFormat {
    assert!(
        quant_level < QUANT_LEVELS,
        "quantization level {quant_level} out of range"
    );
    assert!(
        output.len() >= format.slot_count(),
        "output buffer too small for {format:?}"
    );

    // negative components are not representable in any endpoint format
    let color0 = color0.max(Vec4::ZERO);
    let color1 = color1.max(Vec4::ZERO);

    // Delta representations only have room for their discriminator bits up
    // to this level.
    let try_delta = quant_level <= 18;

    match format {
        EndpointFormat::Rgb | EndpointFormat::RgbDelta => {
            if try_delta {
                if let Some(packed) =
                    ldr::try_quantize_rgb_delta_blue_contract(color0, color1, quant_level, tables)
                {
                    output[..6].copy_from_slice(&packed);
                    return EndpointFormat::RgbDelta;
                }
                if let Some(packed) = ldr::try_quantize_rgb_delta(color0, color1, quant_level, tables)
                {
                    output[..6].copy_from_slice(&packed);
                    return EndpointFormat::RgbDelta;
                }
            }
            if let Some(packed) =
                ldr::try_quantize_rgb_blue_contract(color0, color1, quant_level, tables)
            {
                output[..6].copy_from_slice(&packed);
                return EndpointFormat::Rgb;
            }
            output[..6].copy_from_slice(&ldr::quantize_rgb(color0, color1, quant_level, tables));
            EndpointFormat::Rgb
        }

        EndpointFormat::Rgba | EndpointFormat::RgbaDelta => {
            if try_delta {
                if let Some(packed) =
                    ldr::try_quantize_rgba_delta_blue_contract(color0, color1, quant_level, tables)
                {
                    output[..8].copy_from_slice(&packed);
                    return EndpointFormat::RgbaDelta;
                }
                if let Some(packed) =
                    ldr::try_quantize_rgba_delta(color0, color1, quant_level, tables)
                {
                    output[..8].copy_from_slice(&packed);
                    return EndpointFormat::RgbaDelta;
                }
            }
            if let Some(packed) =
                ldr::try_quantize_rgba_blue_contract(color0, color1, quant_level, tables)
            {
                output[..8].copy_from_slice(&packed);
                return EndpointFormat::Rgba;
            }
            output[..8].copy_from_slice(&ldr::quantize_rgba(color0, color1, quant_level, tables));
            EndpointFormat::Rgba
        }

        EndpointFormat::RgbScale => {
            output[..4].copy_from_slice(&ldr::quantize_rgb_scale(rgbs_color, quant_level, tables));
            EndpointFormat::RgbScale
        }

        EndpointFormat::RgbScaleAlpha => {
            output[..6].copy_from_slice(&ldr::quantize_rgb_scale_alpha(
                color0, color1, rgbs_color, quant_level, tables,
            ));
            EndpointFormat::RgbScaleAlpha
        }

        EndpointFormat::Luminance => {
            output[..2].copy_from_slice(&ldr::quantize_luminance(color0, color1, quant_level, tables));
            EndpointFormat::Luminance
        }

        EndpointFormat::LuminanceAlpha | EndpointFormat::LuminanceAlphaDelta => {
            if try_delta {
                if let Some(packed) =
                    ldr::try_quantize_luminance_alpha_delta(color0, color1, quant_level, tables)
                {
                    output[..4].copy_from_slice(&packed);
                    return EndpointFormat::LuminanceAlphaDelta;
                }
            }
            output[..4].copy_from_slice(&ldr::quantize_luminance_alpha(
                color0, color1, quant_level, tables,
            ));
            EndpointFormat::LuminanceAlpha
        }

        EndpointFormat::HdrRgbScale => {
            output[..4].copy_from_slice(&hdr::quantize_hdr_rgb_scale(rgbo_color, quant_level, tables));
            EndpointFormat::HdrRgbScale
        }

        EndpointFormat::HdrRgb => {
            output[..6].copy_from_slice(&hdr::quantize_hdr_rgb(color0, color1, quant_level, tables));
            EndpointFormat::HdrRgb
        }

        EndpointFormat::HdrLuminanceSmallRange | EndpointFormat::HdrLuminanceLargeRange => {
            if let Some(packed) =
                hdr::try_quantize_hdr_luminance_small_range(color0, color1, quant_level, tables)
            {
                output[..2].copy_from_slice(&packed);
                return EndpointFormat::HdrLuminanceSmallRange;
            }
            output[..2].copy_from_slice(&hdr::quantize_hdr_luminance_large_range(
                color0, color1, quant_level, tables,
            ));
            EndpointFormat::HdrLuminanceLargeRange
        }

        EndpointFormat::HdrRgbLdrAlpha => {
            output[..8].copy_from_slice(&hdr::quantize_hdr_rgb_ldr_alpha(
                color0, color1, quant_level, tables,
            ));
            EndpointFormat::HdrRgbLdrAlpha
        }

        EndpointFormat::HdrRgba => {
            output[..8]
                .copy_from_slice(&hdr::quantize_hdr_rgba(color0, color1, quant_level, tables));
            EndpointFormat::HdrRgba
        }
    }
}

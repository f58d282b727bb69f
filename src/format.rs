/// The color endpoint formats of an ASTC block.
///
/// The discriminant of each variant is the color endpoint mode (CEM) id
/// written into the block bitstream. Formats ending in `Delta` share the
/// slot count of their base format but store endpoint 1 as a signed
/// difference; they are only ever *returned* by the packer when a delta
/// trial succeeds, never required of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointFormat {
    /// A single luminance value per endpoint.
    Luminance = 0,
    /// HDR luminance, base + large-range offset placement.
    HdrLuminanceLargeRange = 2,
    /// HDR luminance, base + small delta.
    HdrLuminanceSmallRange = 3,
    /// Luminance and alpha per endpoint.
    LuminanceAlpha = 4,
    /// Luminance and alpha, delta-encoded.
    LuminanceAlphaDelta = 5,
    /// A single RGB color plus a scale factor; endpoint 0 is the scaled
    /// color and endpoint 1 the unscaled one.
    RgbScale = 6,
    /// HDR RGB plus a scale offset.
    HdrRgbScale = 7,
    /// Two LDR RGB endpoints.
    Rgb = 8,
    /// Two LDR RGB endpoints, delta-encoded.
    RgbDelta = 9,
    /// RGB + scale with two explicit alpha endpoints.
    RgbScaleAlpha = 10,
    /// Two HDR RGB endpoints.
    HdrRgb = 11,
    /// Two LDR RGBA endpoints.
    Rgba = 12,
    /// Two LDR RGBA endpoints, delta-encoded.
    RgbaDelta = 13,
    /// HDR RGB endpoints with LDR alpha endpoints.
    HdrRgbLdrAlpha = 14,
    /// HDR RGB endpoints with HDR alpha endpoints.
    HdrRgba = 15,
}

impl EndpointFormat {
    /// Returns the number of quantized integers this format packs into.
    pub const fn slot_count(&self) -> usize {
        match self {
            Self::Luminance | Self::HdrLuminanceLargeRange | Self::HdrLuminanceSmallRange => 2,
            Self::LuminanceAlpha
            | Self::LuminanceAlphaDelta
            | Self::RgbScale
            | Self::HdrRgbScale => 4,
            Self::Rgb | Self::RgbDelta | Self::RgbScaleAlpha | Self::HdrRgb => 6,
            Self::Rgba | Self::RgbaDelta | Self::HdrRgbLdrAlpha | Self::HdrRgba => 8,
        }
    }

    /// Returns whether the color part of this format stores HDR values.
    pub const fn is_hdr(&self) -> bool {
        matches!(
            self,
            Self::HdrLuminanceLargeRange
                | Self::HdrLuminanceSmallRange
                | Self::HdrRgbScale
                | Self::HdrRgb
                | Self::HdrRgbLdrAlpha
                | Self::HdrRgba
        )
    }

    /// Returns the color endpoint mode id of this format.
    pub const fn cem(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EndpointFormat; 15] = [
        EndpointFormat::Luminance,
        EndpointFormat::HdrLuminanceLargeRange,
        EndpointFormat::HdrLuminanceSmallRange,
        EndpointFormat::LuminanceAlpha,
        EndpointFormat::LuminanceAlphaDelta,
        EndpointFormat::RgbScale,
        EndpointFormat::HdrRgbScale,
        EndpointFormat::Rgb,
        EndpointFormat::RgbDelta,
        EndpointFormat::RgbScaleAlpha,
        EndpointFormat::HdrRgb,
        EndpointFormat::Rgba,
        EndpointFormat::RgbaDelta,
        EndpointFormat::HdrRgbLdrAlpha,
        EndpointFormat::HdrRgba,
    ];

    #[test]
    fn slot_count_matches_cem_class() {
        // The CEM id encodes the integer count in its upper bits.
        for format in ALL {
            let expected = (format.cem() as usize / 4 + 1) * 2;
            assert_eq!(format.slot_count(), expected, "{format:?}");
        }
    }

    #[test]
    fn cem_ids_are_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in ALL.iter().skip(i + 1) {
                assert_ne!(a.cem(), b.cem());
            }
        }
    }
}

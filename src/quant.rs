//! Color quantization tables and the primitives that operate through them.
//!
//! The packer itself never computes quantized values; it only looks them up
//! in a pair of host-supplied tables, one forward (8-bit value to quantized
//! index) and one inverse (index back to the 8-bit reconstruction). Both
//! tables are indexed by quantization level first.

/// The number of quantization levels.
pub const QUANT_LEVELS: usize = 21;

/// The number of codepoints per channel at each quantization level.
///
/// Hosts that synthesize tables via [`ColorQuantTables::from_fn`] can use
/// this to size each level's codomain; the real ASTC tables follow the same
/// progression.
pub const QUANT_RANGES: [u16; QUANT_LEVELS] = [
    2, 3, 4, 5, 6, 8, 10, 12, 16, 20, 24, 32, 40, 48, 64, 80, 96, 128, 160, 192, 256,
];

/// The forward and inverse color quantization tables.
///
/// The packer treats the two tables as an opaque pair: `unquant[l][quant[l][v]]`
/// is expected to be close to `v`, but no bit of `v` is assumed to survive
/// the round trip. Tables are plain public data so hosts can provide their
/// own; they are shared immutably across calls and threads.
pub struct ColorQuantTables {
    /// Maps an 8-bit channel value to its quantized index.
    pub quant: [[u8; 256]; QUANT_LEVELS],
    /// Maps a quantized index back to its 8-bit reconstruction.
    pub unquant: [[u8; 256]; QUANT_LEVELS],
}

impl ColorQuantTables {
    /// Builds tables by evaluating `quant` and `unquant` at every
    /// `(level, value)` pair.
    pub fn from_fn(
        mut quant: impl FnMut(usize, u8) -> u8,
        mut unquant: impl FnMut(usize, u8) -> u8,
    ) -> Self {
        let mut tables = Self {
            quant: [[0; 256]; QUANT_LEVELS],
            unquant: [[0; 256]; QUANT_LEVELS],
        };
        for level in 0..QUANT_LEVELS {
            for value in 0..=255 {
                tables.quant[level][value as usize] = quant(level, value);
                tables.unquant[level][value as usize] = unquant(level, value);
            }
        }
        tables
    }

    /// Forward lookup with the value clamped to `[0, 255]` first.
    #[inline]
    pub(crate) fn quantize_clamped(&self, level: usize, value: i32) -> i32 {
        self.quant[level][value.clamp(0, 255) as usize] as i32
    }

    /// Forward lookup. The value must already be in `[0, 255]`.
    #[inline]
    pub(crate) fn quantize(&self, level: usize, value: i32) -> i32 {
        debug_assert!((0..=255).contains(&value));
        self.quant[level][value as usize] as i32
    }

    /// Inverse lookup of a quantized index.
    #[inline]
    pub(crate) fn unquantize(&self, level: usize, index: i32) -> i32 {
        debug_assert!((0..=255).contains(&index));
        self.unquant[level][index as usize] as i32
    }

    /// Quantizes and immediately unquantizes `value`, returning
    /// `(index, reconstruction)`.
    #[inline]
    pub(crate) fn round_trip(&self, level: usize, value: i32) -> (i32, i32) {
        let index = self.quantize(level, value);
        (index, self.unquantize(level, index))
    }

    /// Like [`Self::round_trip`], but guarantees that the bits selected by
    /// `mask` are identical in the source value and the reconstruction.
    ///
    /// Whenever the round trip crosses a retained-bit boundary, the source
    /// value is stepped down into the previous quantization cell and the
    /// lookup retried. This terminates: value 0 reconstructs with all
    /// retained bits clear under any monotone table.
    pub(crate) fn round_trip_retaining(&self, level: usize, value: i32, mask: i32) -> (i32, i32) {
        debug_assert!(mask == 0xC0 || mask == 0xF0);
        let mut value = value;
        loop {
            let (index, reconstruction) = self.round_trip(level, value);
            if (reconstruction & mask) == (value & mask) {
                return (index, reconstruction);
            }
            value -= 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Tables where both directions are the identity map at every level.
    pub(crate) fn identity_tables() -> ColorQuantTables {
        ColorQuantTables::from_fn(|_, v| v, |_, v| v)
    }

    /// Tables with the real per-level codepoint counts, rounding linearly.
    pub(crate) fn ranged_tables() -> ColorQuantTables {
        ColorQuantTables::from_fn(
            |level, v| {
                let max = (QUANT_RANGES[level] - 1) as f32;
                (v as f32 / 255.0 * max + 0.5) as u8
            },
            |level, q| {
                let max = QUANT_RANGES[level] - 1;
                let q = (q as u16).min(max) as f32;
                (q / max as f32 * 255.0 + 0.5) as u8
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn clamped_lookup() {
        let tables = ranged_tables();
        for level in 0..QUANT_LEVELS {
            assert_eq!(
                tables.quantize_clamped(level, -500),
                tables.quantize(level, 0)
            );
            assert_eq!(
                tables.quantize_clamped(level, 300),
                tables.quantize(level, 255)
            );
        }
    }

    #[test]
    fn round_trip_stays_in_cell() {
        let tables = ranged_tables();
        for level in 0..QUANT_LEVELS {
            let cell = 255.0 / (QUANT_RANGES[level] - 1) as f32;
            for value in 0..=255 {
                let (_, u) = tables.round_trip(level, value);
                assert!((u - value).abs() as f32 <= cell, "level {level}, {value} -> {u}");
            }
        }
    }

    #[test]
    fn retained_bits_survive() {
        let tables = ranged_tables();
        for level in 0..QUANT_LEVELS {
            for mask in [0xC0, 0xF0] {
                for value in 0..=255 {
                    let (index, u) = tables.round_trip_retaining(level, value, mask);
                    assert_eq!(tables.unquantize(level, index), u);
                    // the reconstruction agrees with *some* source value at
                    // or below the input on the retained bits
                    assert!(u & mask <= value & mask);
                }
            }
        }
    }

    #[test]
    fn retained_bits_identity_is_exact() {
        let tables = identity_tables();
        for value in 0..=255 {
            let (index, u) = tables.round_trip_retaining(7, value, 0xF0);
            assert_eq!(index, value);
            assert_eq!(u, value);
        }
    }
}

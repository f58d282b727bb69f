#![forbid(unsafe_code)]

//! Color endpoint packing for ASTC texture encoders.
//!
//! ASTC blocks interpolate per-texel colors between two endpoints, and
//! every endpoint format has its own bit layout: LDR and HDR variants,
//! with or without alpha, and several alternative sub-representations
//! (direct, base + delta, blue-contracted, luminance, RGB + scale, a
//! family of HDR modes of differing precision). This crate implements the
//! encoder side of that choice: given two endpoint colors and a requested
//! format, it runs the trial encoders for the cheaper representations,
//! verifies their bit-level invariants through a quantize → unquantize
//! round trip, and falls back to the format family's infallible encoder
//! when none fits.
//!
//! The quantization tables themselves are host-supplied (see
//! [`ColorQuantTables`]); the packer is a pure function over its inputs
//! and can be called from any number of threads sharing one table set.
//!
//! ```
//! use astc_endpoints::{
//!     pack_color_endpoints, ColorQuantTables, EndpointFormat, Vec4, QUANT_RANGES,
//! };
//!
//! // stand-in tables; a real encoder supplies the ASTC ones
//! let tables = ColorQuantTables::from_fn(
//!     |level, v| {
//!         let max = (QUANT_RANGES[level] - 1) as f32;
//!         (v as f32 / 255.0 * max + 0.5) as u8
//!     },
//!     |level, q| {
//!         let max = QUANT_RANGES[level] - 1;
//!         ((q as u16).min(max) as f32 / max as f32 * 255.0 + 0.5) as u8
//!     },
//! );
//!
//! let mut output = [0u8; 8];
//! let chosen = pack_color_endpoints(
//!     Vec4::new(25700.0, 25700.0, 25700.0, 65535.0),
//!     Vec4::new(51400.0, 51400.0, 51400.0, 65535.0),
//!     Vec4::ZERO,
//!     Vec4::ZERO,
//!     EndpointFormat::Rgb,
//!     &mut output,
//!     12,
//!     &tables,
//! );
//! assert!(matches!(chosen, EndpointFormat::Rgb | EndpointFormat::RgbDelta));
//! ```

mod encode;
mod format;
mod quant;

pub use encode::pack_color_endpoints;
pub use format::EndpointFormat;
pub use quant::{ColorQuantTables, QUANT_LEVELS, QUANT_RANGES};

// endpoint colors are passed as glam vectors
pub use glam::Vec4;

//! # lumen-core
//!
//! Foundation types for the lumen color conversion pipeline.
//!
//! - [`RawImage`], [`Samples`] - RGBA pixel storage at 8 or 16 bits
//! - [`to_linear_float`], [`from_linear_float`] - integer <-> float conversion
//! - [`Rect`] - crop rectangles with clamping
//! - [`task_ranges`], [`run_ranges`] - splitting pixel work across rayon tasks
//! - [`Tonemap`], [`LuminanceScale`] - luminance scaling policy and curve
//! - [`Error`], [`ErrorKind`] - the shared failure taxonomy
//!
//! This crate has no internal dependencies; every other lumen crate builds on it:
//!
//! ```text
//! lumen-core
//!    ^
//!    +-- lumen-icc (profiles, CMM)
//!    +-- lumen-io (codecs)
//!    +-- lumen-ops (transform, grade, resize, HALD)
//!    +-- lumen-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod pixel;
pub mod rect;
pub mod task;
pub mod tonemap;

pub use error::{Error, ErrorKind, Result};
pub use pixel::{
    depth_to_bytes, from_linear_float, max_value, quantize, to_linear_float, try_alloc,
    write_linear_float, RawImage, Samples, CHANNELS,
};
pub use rect::Rect;
pub use task::{effective_jobs, map_ranges, run_ranges, run_ranges_in_place, task_ranges};
pub use tonemap::{LuminanceScale, Tonemap, KNEE_FLOOR};

/// Reference luminance (nits) assumed for profiles that carry none.
pub const DEFAULT_LUMINANCE: u32 = 100;

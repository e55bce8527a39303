//! # lumen-io
//!
//! Image codecs for the lumen color converter.
//!
//! Every format implements the [`Codec`] trait. Codecs decode to a
//! [`RawImage`](lumen_core::RawImage) (always RGBA, 8 or 16 bits) plus the
//! embedded ICC profile bytes, and encode the reverse. They know nothing
//! about color management; the profile is an opaque blob at this layer.
//!
//! | Format | Read | Write | Depths | Profile |
//! |--------|------|-------|--------|---------|
//! | PNG    | yes  | yes   | 8, 16  | `iCCP`  |
//! | JPEG   | yes  | yes   | 8      | APP2    |
//! | JP2    | yes (feature `jp2`) | no | 8-16 | - |
//! | ICC    | yes  | yes   | -      | whole file |
//!
//! [`FormatRegistry`] maps names and extensions to codecs, detects formats
//! from file signatures and writes files atomically.

#![warn(missing_docs)]

mod error;
pub mod icc;
pub mod jpeg;
#[cfg(feature = "jp2")]
pub mod jp2;
pub mod png;
pub mod registry;
pub mod traits;

pub use error::{IoError, IoResult};
pub use icc::IccCodec;
#[cfg(feature = "jp2")]
pub use jp2::Jp2Codec;
pub use jpeg::JpegCodec;
pub use png::PngCodec;
pub use registry::{write_atomic, FormatRegistry};
pub use traits::{Codec, Decoded, FormatDepth, WriteParams};

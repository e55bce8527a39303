//! # lumen-ops
//!
//! Profile-driven image operations.
//!
//! Everything here shares one discipline: convert pixels to linear floats,
//! operate, convert back. The [`Transform`] owns that round trip; the
//! grader, resizer and report code borrow its two halves.
//!
//! # Modules
//!
//! - [`transform`] - source to destination pipeline (direct, linear, analytic)
//! - [`grade`] - automatic luminance and gamma selection
//! - [`resize`] - linear-light resampling
//! - [`hald`] - HALD CLUT application
//! - [`convert`] - the convert / generate flows
//! - [`report`] - serializable identify, report and calc output
//!
//! # Example
//!
//! ```rust
//! use lumen_core::Tonemap;
//! use lumen_icc::{Curve, Primaries, Profile};
//! use lumen_ops::{Context, Image};
//!
//! let ctx = Context::new().with_jobs(2);
//! let hdr = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.2), Some(1000), None).unwrap();
//! let sdr = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.2), Some(100), None).unwrap();
//!
//! let image = Image::create(4, 4, 16, Some(&hdr)).unwrap();
//! let out = image.convert(&ctx, 8, &sdr, Tonemap::Auto).unwrap();
//! assert_eq!(out.depth(), 8);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ccmm;
mod context;
mod error;
mod image;

pub mod convert;
pub mod dump;
pub mod grade;
pub mod hald;
pub mod params;
pub mod report;
pub mod resize;
pub mod transform;

pub use context::Context;
pub use convert::{ConvertOutput, Destination};
pub use error::{OpsError, OpsResult};
pub use grade::{color_grade, Grade};
pub use hald::hald_dims;
pub use image::Image;
pub use params::{ConversionParams, ResizeSpec};
pub use resize::Filter;
pub use transform::Transform;

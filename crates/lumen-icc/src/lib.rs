//! # lumen-icc
//!
//! ICC profile handling for lumen, built on Little CMS 2.
//!
//! - [`Profile`] - parse, synthesize, clone, serialize and query RGB profiles
//! - [`Primaries`], [`Curve`] - the canonical profile description
//! - [`StockProfile`] - sRGB, BT.709, BT.2020, P3 and their PQ variants
//! - [`CmmTransform`], [`CmmPlan`] - lcms2 pixel transforms, per worker task
//! - [`tag_table`] - raw tag directory for diagnostics
//!
//! # Example
//!
//! ```rust
//! use lumen_icc::{StockProfile, CurveKind};
//!
//! let pq = StockProfile::Bt2020Pq.to_profile().unwrap();
//! let info = pq.query().unwrap();
//! assert_eq!(info.luminance, 10000);
//! assert_eq!(info.curve.kind, CurveKind::Complex);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod curve;
mod error;
mod primaries;
mod profile;
mod standard;
mod tags;
mod transform;

pub use curve::{pq_eotf, Curve, CurveKind};
pub use error::{IccError, IccResult};
pub use primaries::{bradford_adapt, xy_to_xyz, xyz_to_xy, Primaries, BRADFORD, D50, D65};
pub use profile::{describe, Profile, ProfileInfo, SpecialCurve};
pub use standard::{StockProfile, PQ_LUMINANCE};
pub use tags::{chromatic_adaptation, tag_table, TagInfo};
pub use transform::{CmmPixel, CmmPlan, CmmTransform};

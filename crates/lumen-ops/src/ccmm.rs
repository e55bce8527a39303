//! Analytic transform for profiles that are a plain gamma curve.
//!
//! Decode with `x^gamma`, move RGB through XYZ with Bradford adaptation
//! between the white points, apply the luminance stage, re-encode with
//! `x^(1/gamma)`. No lcms2 handle is involved.

use glam::{Mat3, Vec3};
use lumen_core::{run_ranges, to_linear_float, try_alloc, write_linear_float, LuminanceScale, Samples};
use lumen_icc::{bradford_adapt, ProfileInfo};

use crate::{OpsError, OpsResult};

/// Precomputed analytic pipeline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Analytic {
    src_gamma: f32,
    dst_inv_gamma: f32,
    matrix: Mat3,
    scale: LuminanceScale,
}

impl Analytic {
    pub(crate) fn new(src: &ProfileInfo, dst: &ProfileInfo, scale: LuminanceScale) -> Self {
        let adapt = bradford_adapt(src.primaries.white_xyz(), dst.primaries.white_xyz());
        let matrix = dst.primaries.xyz_to_rgb() * adapt * src.primaries.rgb_to_xyz();
        Self {
            src_gamma: src.curve.gamma,
            dst_inv_gamma: 1.0 / dst.curve.gamma,
            matrix,
            scale,
        }
    }

    #[inline]
    fn pixel(&self, src: &[f32], dst: &mut [f32]) {
        let decoded = Vec3::new(
            src[0].max(0.0).powf(self.src_gamma),
            src[1].max(0.0).powf(self.src_gamma),
            src[2].max(0.0).powf(self.src_gamma),
        );
        let rgb = self.matrix * decoded;
        for (c, v) in rgb.to_array().into_iter().enumerate() {
            dst[c] = self.scale.apply(v).clamp(0.0, 1.0).powf(self.dst_inv_gamma);
        }
        dst[3] = src[3];
    }

    pub(crate) fn run(
        &self,
        tasks: usize,
        src: &Samples,
        src_depth: u32,
        dst: &mut Samples,
        dst_depth: u32,
    ) -> OpsResult<()> {
        let unorm = to_linear_float(src, src_depth)?;
        let mut out = try_alloc(unorm.len(), 0.0f32)?;
        run_ranges(tasks, &unorm, 4, &mut out, 4, |_, s, d| {
            for (i, o) in s.chunks_exact(4).zip(d.chunks_exact_mut(4)) {
                self.pixel(i, o);
            }
            Ok::<(), OpsError>(())
        })?;
        write_linear_float(&out, dst_depth, dst);
        Ok(())
    }
}

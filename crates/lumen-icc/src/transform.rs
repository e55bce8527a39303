//! The external CMM: lcms2 transforms between two profiles.
//!
//! lcms2 handles are not shared across threads. A [`CmmPlan`] keeps only
//! the serialized profiles, is `Sync`, and lets every worker task build its
//! own [`CmmTransform`].

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use lcms2::{Intent, PixelFormat, Transform as LcmsTransform};

use crate::{IccError, IccResult, Profile};

/// A pixel type lcms2 can read or write: four interleaved RGBA channels.
pub trait CmmPixel: Pod + Send + Sync + 'static {
    /// lcms2 layout for this pixel type.
    const FORMAT: PixelFormat;
}

impl CmmPixel for [u8; 4] {
    const FORMAT: PixelFormat = PixelFormat::RGBA_8;
}

impl CmmPixel for [u16; 4] {
    const FORMAT: PixelFormat = PixelFormat::RGBA_16;
}

impl CmmPixel for [f32; 4] {
    const FORMAT: PixelFormat = PixelFormat::RGBA_FLT;
}

/// A perceptual-intent transform between two RGB profiles.
///
/// Only the color channels are converted; alpha handling is left to the caller.
///
/// # Example
///
/// ```rust
/// use lumen_icc::{CmmTransform, Curve, Primaries, Profile};
///
/// let src = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.2), None, None).unwrap();
/// let linear = Profile::synthesize(&Primaries::BT709, &Curve::LINEAR, None, None).unwrap();
/// let cmm = CmmTransform::<[u8; 4], [f32; 4]>::new(&src, &linear).unwrap();
///
/// let mut out = [[0.0f32; 4]];
/// cmm.apply(&[[255, 255, 255, 255]], &mut out);
/// assert!((out[0][1] - 1.0).abs() < 1e-3);
/// ```
pub struct CmmTransform<I: CmmPixel, O: CmmPixel> {
    inner: LcmsTransform<I, O>,
}

impl<I: CmmPixel, O: CmmPixel> CmmTransform<I, O> {
    /// Builds a transform from `src` to `dst`.
    pub fn new(src: &Profile, dst: &Profile) -> IccResult<Self> {
        let inner = LcmsTransform::new(&src.inner, I::FORMAT, &dst.inner, O::FORMAT, Intent::Perceptual)
            .map_err(|e| IccError::TransformFailed(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Converts `src` into `dst`; both must hold the same number of pixels.
    pub fn apply(&self, src: &[I], dst: &mut [O]) {
        debug_assert_eq!(src.len(), dst.len());
        self.inner.transform_pixels(src, dst);
    }
}

impl<I: CmmPixel, O: CmmPixel> std::fmt::Debug for CmmTransform<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmmTransform").finish_non_exhaustive()
    }
}

/// Serialized source and destination profiles, ready to instantiate per task.
#[derive(Debug, Clone)]
pub struct CmmPlan<I: CmmPixel, O: CmmPixel> {
    src: Arc<[u8]>,
    dst: Arc<[u8]>,
    _pixels: PhantomData<fn(I) -> O>,
}

impl<I: CmmPixel, O: CmmPixel> CmmPlan<I, O> {
    /// Captures both profiles and checks that lcms2 accepts the pair.
    pub fn new(src: &Profile, dst: &Profile) -> IccResult<Self> {
        CmmTransform::<I, O>::new(src, dst)?;
        Ok(Self {
            src: Arc::from(src.to_bytes()),
            dst: Arc::from(dst.to_bytes()),
            _pixels: PhantomData,
        })
    }

    /// Builds a transform owned by the calling task.
    pub fn instantiate(&self) -> IccResult<CmmTransform<I, O>> {
        let src = Profile::parse(&self.src)?;
        let dst = Profile::parse(&self.dst)?;
        CmmTransform::new(&src, &dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Curve, Primaries};
    use approx::assert_abs_diff_eq;

    #[test]
    fn gamma_to_linear() {
        let src = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.0), None, None).unwrap();
        let dst = Profile::synthesize(&Primaries::BT709, &Curve::LINEAR, None, None).unwrap();
        let cmm = CmmTransform::<[u16; 4], [f32; 4]>::new(&src, &dst).unwrap();
        let mut out = [[0.0f32; 4]; 2];
        cmm.apply(&[[32768, 32768, 32768, 65535], [0, 0, 0, 0]], &mut out);
        assert_abs_diff_eq!(out[0][0], 0.25, epsilon = 2e-3);
        assert_abs_diff_eq!(out[0][2], 0.25, epsilon = 2e-3);
        assert_abs_diff_eq!(out[1][1], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn float_to_integer_layouts() {
        let linear = Profile::synthesize(&Primaries::BT709, &Curve::LINEAR, None, None).unwrap();
        let gamma = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.0), None, None).unwrap();
        let plan = CmmPlan::<[f32; 4], [u16; 4]>::new(&linear, &gamma).unwrap();
        let cmm = plan.instantiate().unwrap();
        let mut out = [[0u16; 4]; 2];
        cmm.apply(&[[0.25, 0.25, 0.25, 1.0], [1.0, 1.0, 1.0, 1.0]], &mut out);
        assert!(out[0][0].abs_diff(32768) <= 64, "{:?}", out[0]);
        assert_eq!(out[1][..3], [65535, 65535, 65535]);
    }

    #[test]
    fn plan_instantiates_on_workers() {
        let src = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), None, None).unwrap();
        let dst = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.2), None, None).unwrap();
        let plan = CmmPlan::<[u8; 4], [u8; 4]>::new(&src, &dst).unwrap();
        let results: Vec<[u8; 4]> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..3)
                .map(|_| {
                    let plan = &plan;
                    s.spawn(move || {
                        let cmm = plan.instantiate().unwrap();
                        let mut out = [[0u8; 4]];
                        cmm.apply(&[[128, 128, 128, 255]], &mut out);
                        out[0]
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        // neutral grey stays neutral
        let [r, g, b, _] = results[0];
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1);
    }
}

//! The pixel pipeline between two profiles.
//!
//! A [`Transform`] is bound once per conversion and picks one of three
//! routes:
//!
//! - **direct**: source and destination luminance match and tonemapping is
//!   not forced, so lcms2 converts integer pixels straight across;
//! - **linear**: pixels go to a gamma 1.0 float buffer at the destination
//!   primaries, get scaled (and possibly tonemapped), then go to the
//!   destination profile;
//! - **analytic** ("CCMM"): both profiles are plain gamma curves, the
//!   context allows it and tonemapping is not forced, so the whole thing is
//!   a matrix and two powers.
//!
//! Every route clamps to `[0, 1]` before quantizing. lcms2 handles are built
//! per worker task from the serialized profiles. The linear plans are only
//! built when the linear route runs or a caller asks for linear floats.

use std::cell::OnceCell;
use std::time::Instant;

use bytemuck::Pod;
use lumen_core::{
    from_linear_float, run_ranges, to_linear_float, try_alloc, write_linear_float, LuminanceScale,
    Samples, Tonemap, DEFAULT_LUMINANCE,
};
use lumen_icc::{CmmPixel, CmmPlan, Curve, IccError, Profile, ProfileInfo};
use tracing::{debug, info};

use crate::ccmm::Analytic;
use crate::{Context, Image, OpsError, OpsResult};

type FloatPlan = CmmPlan<[f32; 4], [f32; 4]>;

/// RGBA pixel types the direct route works on.
trait Rgba: CmmPixel + Pod {
    const MAX: u32;
    fn alpha(&self) -> u32;
    fn set_alpha(&mut self, a: u32);
}

impl Rgba for [u8; 4] {
    const MAX: u32 = 255;
    fn alpha(&self) -> u32 {
        self[3] as u32
    }
    fn set_alpha(&mut self, a: u32) {
        self[3] = a as u8;
    }
}

impl Rgba for [u16; 4] {
    const MAX: u32 = 65535;
    fn alpha(&self) -> u32 {
        self[3] as u32
    }
    fn set_alpha(&mut self, a: u32) {
        self[3] = a as u16;
    }
}

enum DirectPlan {
    U8U8(CmmPlan<[u8; 4], [u8; 4]>),
    U8U16(CmmPlan<[u8; 4], [u16; 4]>),
    U16U8(CmmPlan<[u16; 4], [u8; 4]>),
    U16U16(CmmPlan<[u16; 4], [u16; 4]>),
}

impl DirectPlan {
    fn new(src: &Profile, src_depth: u32, dst: &Profile, dst_depth: u32) -> OpsResult<Self> {
        Ok(match (src_depth > 8, dst_depth > 8) {
            (false, false) => DirectPlan::U8U8(CmmPlan::new(src, dst)?),
            (false, true) => DirectPlan::U8U16(CmmPlan::new(src, dst)?),
            (true, false) => DirectPlan::U16U8(CmmPlan::new(src, dst)?),
            (true, true) => DirectPlan::U16U16(CmmPlan::new(src, dst)?),
        })
    }

    fn run(&self, tasks: usize, src: &Samples, dst: &mut Samples) -> OpsResult<()> {
        match (self, src, dst) {
            (DirectPlan::U8U8(p), Samples::U8(s), Samples::U8(d)) => run_direct(p, tasks, s.as_slice(), d.as_mut_slice()),
            (DirectPlan::U8U16(p), Samples::U8(s), Samples::U16(d)) => run_direct(p, tasks, s.as_slice(), d.as_mut_slice()),
            (DirectPlan::U16U8(p), Samples::U16(s), Samples::U8(d)) => run_direct(p, tasks, s.as_slice(), d.as_mut_slice()),
            (DirectPlan::U16U16(p), Samples::U16(s), Samples::U16(d)) => run_direct(p, tasks, s.as_slice(), d.as_mut_slice()),
            _ => Err(OpsError::InvalidParameter("sample storage does not match transform depths".into())),
        }
    }
}

fn run_direct<I, O, SI, SO>(plan: &CmmPlan<I, O>, tasks: usize, src: &[SI], dst: &mut [SO]) -> OpsResult<()>
where
    I: Rgba,
    O: Rgba,
    SI: Pod,
    SO: Pod,
{
    let src: &[I] = bytemuck::cast_slice(src);
    let dst: &mut [O] = bytemuck::cast_slice_mut(dst);
    run_ranges(tasks, src, 1, dst, 1, |_, s, d| {
        let cmm = plan.instantiate()?;
        cmm.apply(s, d);
        for (o, i) in d.iter_mut().zip(s) {
            o.set_alpha((i.alpha() * O::MAX + I::MAX / 2) / I::MAX);
        }
        Ok::<(), OpsError>(())
    })
}

/// Converts float RGBA through `plan`, carrying alpha over unchanged.
fn run_float(plan: &FloatPlan, tasks: usize, src: &[f32]) -> OpsResult<Vec<f32>> {
    let mut out = try_alloc(src.len(), 0.0f32)?;
    let src4: &[[f32; 4]] = bytemuck::cast_slice(src);
    let out4: &mut [[f32; 4]] = bytemuck::cast_slice_mut(&mut out);
    run_ranges(tasks, src4, 1, out4, 1, |_, s, d| {
        let cmm = plan.instantiate()?;
        cmm.apply(s, d);
        for (o, i) in d.iter_mut().zip(s) {
            o[3] = i[3];
        }
        Ok::<(), OpsError>(())
    })?;
    Ok(out)
}

enum Route {
    Direct(DirectPlan),
    Linear,
    Analytic(Analytic),
}

/// Profiles the linear route is built from, kept until a caller needs it.
struct LinearSource {
    src: Profile,
    intermediate: Profile,
    /// `None` when the destination already is the linear intermediate.
    dst: Option<Profile>,
}

/// Plans for the two halves of the linear route.
///
/// `from_linear` is `None` when the destination already is the linear
/// intermediate (gamma 1.0 at its own primaries).
struct LinearPlans {
    to_linear: FloatPlan,
    from_linear: Option<FloatPlan>,
}

impl LinearPlans {
    fn encode(&self, tasks: usize, linear: &[f32]) -> OpsResult<Vec<f32>> {
        match &self.from_linear {
            Some(plan) => run_float(plan, tasks, linear),
            None => Ok(linear.to_vec()),
        }
    }
}

/// A bound source -> destination pipeline.
///
/// ```rust
/// use lumen_core::{Samples, Tonemap};
/// use lumen_icc::{Curve, Primaries, Profile};
/// use lumen_ops::{Context, Transform};
///
/// let ctx = Context::new().with_jobs(2);
/// let hdr = Profile::synthesize(&Primaries::BT709, &Curve::LINEAR, Some(1000), None).unwrap();
/// let sdr = Profile::synthesize(&Primaries::BT709, &Curve::LINEAR, Some(100), None).unwrap();
///
/// let xf = Transform::new(&ctx, &hdr, 16, &sdr, 8, Tonemap::Auto).unwrap();
/// assert!(xf.uses_linear_path());
/// assert!(xf.luminance_scale().tonemap());
/// assert_eq!(xf.cmm_name(), "LCMS");
/// ```
pub struct Transform {
    src_depth: u32,
    dst_depth: u32,
    tasks: usize,
    scale: LuminanceScale,
    route: Route,
    linear_source: Option<LinearSource>,
    linear: OnceCell<LinearPlans>,
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("cmm", &self.cmm_name())
            .field("src_depth", &self.src_depth)
            .field("dst_depth", &self.dst_depth)
            .field("scale", &self.scale)
            .field("linear", &self.uses_linear_path())
            .finish()
    }
}

/// Luminance in nits the curve actually reaches at input 1.0.
fn effective_luminance(info: Option<&ProfileInfo>, profile: &Profile) -> f32 {
    match info {
        Some(q) => q.luminance as f32 * q.curve.implicit_scale,
        None => profile.luminance().unwrap_or(DEFAULT_LUMINANCE) as f32,
    }
}

impl Transform {
    /// Binds a pipeline from (`src`, `src_depth`) to (`dst`, `dst_depth`).
    pub fn new(
        ctx: &Context,
        src: &Profile,
        src_depth: u32,
        dst: &Profile,
        dst_depth: u32,
        tonemap: Tonemap,
    ) -> OpsResult<Self> {
        for depth in [src_depth, dst_depth] {
            if depth != 8 && depth != 16 {
                return Err(OpsError::InvalidParameter(format!("transform depth must be 8 or 16, got {depth}")));
            }
        }

        let src_info = src.query().ok();
        let dst_info = dst.query().ok();
        let src_lum = effective_luminance(src_info.as_ref(), src);
        let dst_lum = effective_luminance(dst_info.as_ref(), dst);
        let scale = LuminanceScale::new(src_lum, dst_lum, tonemap);

        let linear_source = match &dst_info {
            Some(info) => {
                let dst_is_linear = info.curve.is_simple_gamma() && (info.curve.gamma - 1.0).abs() < 1e-4;
                Some(LinearSource {
                    src: src.try_clone()?,
                    intermediate: Profile::synthesize(
                        &info.primaries,
                        &Curve::LINEAR,
                        None,
                        Some("Lumen linear intermediate"),
                    )?,
                    dst: if dst_is_linear { None } else { Some(dst.try_clone()?) },
                })
            }
            None => None,
        };

        let forced = tonemap == Tonemap::On;
        let luminance_match = (src_lum - dst_lum).abs() < 1e-3;
        let route = match (&src_info, &dst_info) {
            (Some(s), Some(d)) if !forced && ctx.ccmm_allowed && src.ccmm_compatible() && dst.ccmm_compatible() => {
                Route::Analytic(Analytic::new(s, d, scale))
            }
            _ if luminance_match && !forced => Route::Direct(DirectPlan::new(src, src_depth, dst, dst_depth)?),
            _ => {
                if linear_source.is_none() {
                    return Err(IccError::Unsupported(format!(
                        "cannot scale luminance into '{}': primaries unknown",
                        dst.description()
                    ))
                    .into());
                }
                Route::Linear
            }
        };

        let xf = Self {
            src_depth,
            dst_depth,
            tasks: ctx.tasks(),
            scale,
            route,
            linear_source,
            linear: OnceCell::new(),
        };
        if xf.uses_linear_path() {
            xf.plans()?;
        }
        debug!(
            cmm = xf.cmm_name(),
            src_luminance = src_lum,
            dst_luminance = dst_lum,
            scale = xf.scale.scale(),
            mode = xf.scale.mode_name(),
            linear = xf.uses_linear_path(),
            "transform bound"
        );
        Ok(xf)
    }

    /// `"CCMM"` for the analytic route, `"LCMS"` otherwise.
    pub fn cmm_name(&self) -> &'static str {
        match self.route {
            Route::Analytic(_) => "CCMM",
            _ => "LCMS",
        }
    }

    /// True when pixels pass through an intermediate float buffer in lcms2.
    pub fn uses_linear_path(&self) -> bool {
        matches!(self.route, Route::Linear)
    }

    /// The resolved luminance stage.
    pub fn luminance_scale(&self) -> LuminanceScale {
        self.scale
    }

    /// Converts `src` (source depth) into `dst` (destination depth).
    pub fn run(&self, src: &Samples, dst: &mut Samples) -> OpsResult<()> {
        if src.len() != dst.len() {
            return Err(lumen_core::Error::SizeMismatch { expected: src.len(), actual: dst.len() }.into());
        }
        match &self.route {
            Route::Analytic(a) => a.run(self.tasks, src, self.src_depth, dst, self.dst_depth),
            Route::Direct(plan) => plan.run(self.tasks, src, dst),
            Route::Linear => {
                let mut linear = self.to_linear(src)?;
                self.scale.apply_rgba(&mut linear);
                self.from_linear(&linear, dst)
            }
        }
    }

    /// Linear route plans, built on first use.
    fn plans(&self) -> OpsResult<&LinearPlans> {
        if let Some(plans) = self.linear.get() {
            return Ok(plans);
        }
        let source = self
            .linear_source
            .as_ref()
            .ok_or_else(|| IccError::Unsupported("destination primaries unknown, no linear route".into()))?;
        let plans = LinearPlans {
            to_linear: CmmPlan::new(&source.src, &source.intermediate)?,
            from_linear: source
                .dst
                .as_ref()
                .map(|dst| CmmPlan::new(&source.intermediate, dst))
                .transpose()?,
        };
        Ok(self.linear.get_or_init(|| plans))
    }

    /// Source samples to linear RGBA floats at the destination primaries.
    ///
    /// 1.0 is the source reference luminance; no luminance scaling is applied.
    pub fn to_linear(&self, src: &Samples) -> OpsResult<Vec<f32>> {
        let plans = self.plans()?;
        let unorm = to_linear_float(src, self.src_depth)?;
        run_float(&plans.to_linear, self.tasks, &unorm)
    }

    /// Linear RGBA floats to destination samples, clamped and quantized.
    pub fn from_linear(&self, linear: &[f32], dst: &mut Samples) -> OpsResult<()> {
        if linear.len() != dst.len() {
            return Err(lumen_core::Error::SizeMismatch { expected: dst.len(), actual: linear.len() }.into());
        }
        let encoded = self.plans()?.encode(self.tasks, linear)?;
        write_linear_float(&encoded, self.dst_depth, dst);
        Ok(())
    }

    /// Like [`Transform::from_linear`] but allocates the destination.
    pub fn from_linear_new(&self, linear: &[f32]) -> OpsResult<Samples> {
        let encoded = self.plans()?.encode(self.tasks, linear)?;
        Ok(from_linear_float(&encoded, self.dst_depth)?)
    }
}

/// Converts `image` into a new image at `depth` bits in `dst_profile`.
pub(crate) fn convert_image(
    ctx: &Context,
    image: &Image,
    depth: u32,
    dst_profile: &Profile,
    tonemap: Tonemap,
) -> OpsResult<Image> {
    let mut dst = Image::create(image.width(), image.height(), depth, Some(dst_profile))?;
    if ctx.verbose {
        info!("source:");
        crate::dump::dump_image(image, None);
        info!("destination:");
        crate::dump::dump_image(&dst, None);
    }

    let xf = Transform::new(ctx, image.profile(), image.depth(), dst.profile(), depth, tonemap)?;
    let scale = xf.luminance_scale();
    info!(
        "Converting ({}, lum scale {}x, {})...",
        xf.cmm_name(),
        scale.scale(),
        scale.mode_name()
    );
    let start = Instant::now();
    xf.run(image.samples(), dst.samples_mut())?;
    debug!(elapsed = start.elapsed().as_secs_f64(), "converted");
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::RawImage;
    use lumen_icc::Primaries;

    fn linear(lum: u32) -> Profile {
        Profile::synthesize(&Primaries::BT709, &Curve::LINEAR, Some(lum), None).unwrap()
    }

    fn gamma(g: f32, lum: u32) -> Profile {
        Profile::synthesize(&Primaries::BT709, &Curve::gamma(g), Some(lum), None).unwrap()
    }

    #[test]
    fn route_selection() {
        let ctx = Context::new().with_jobs(1);
        let a = gamma(2.2, 100);

        let same = Transform::new(&ctx, &a, 8, &a, 8, Tonemap::Auto).unwrap();
        assert!(!same.uses_linear_path());
        assert!(same.luminance_scale().is_identity());

        // Forced tonemap always takes the linear route, even at scale 1
        let forced = Transform::new(&ctx, &a, 8, &a, 8, Tonemap::On).unwrap();
        assert!(forced.uses_linear_path());

        let down = Transform::new(&ctx, &gamma(2.2, 1000), 8, &a, 8, Tonemap::Off).unwrap();
        assert!(down.uses_linear_path());
        assert!(!down.luminance_scale().tonemap());

        let ccmm_ctx = Context::new().with_jobs(1).with_ccmm(true);
        let ccmm = Transform::new(&ccmm_ctx, &a, 8, &gamma(2.4, 100), 16, Tonemap::Auto).unwrap();
        assert_eq!(ccmm.cmm_name(), "CCMM");

        // forcing the tonemap wins over the analytic path
        let forced_ccmm = Transform::new(&ccmm_ctx, &a, 8, &gamma(2.4, 100), 16, Tonemap::On).unwrap();
        assert!(forced_ccmm.uses_linear_path());
        assert_eq!(forced_ccmm.cmm_name(), "LCMS");
    }

    #[test]
    fn linear_plans_built_on_demand() {
        let ctx = Context::new().with_jobs(2);
        let p = gamma(2.2, 100);
        let direct = Transform::new(&ctx, &p, 8, &p, 8, Tonemap::Auto).unwrap();
        assert!(direct.linear.get().is_none());
        let lin = direct.to_linear(&Samples::U8(vec![255, 255, 255, 255])).unwrap();
        assert!(direct.linear.get().is_some());
        assert!((lin[0] - 1.0).abs() < 1e-3);

        let scaled = Transform::new(&ctx, &gamma(2.2, 400), 8, &p, 8, Tonemap::Auto).unwrap();
        assert!(scaled.linear.get().is_some());
    }

    #[test]
    fn bad_depth() {
        let ctx = Context::new();
        let a = gamma(2.2, 100);
        assert!(Transform::new(&ctx, &a, 10, &a, 8, Tonemap::Auto).is_err());
    }

    #[test]
    fn direct_identity_preserves_pixels() {
        let ctx = Context::new().with_jobs(3);
        let p = gamma(2.2, 100);
        let src = Samples::U8((0..=255u8).flat_map(|v| [v, 255 - v, v / 2, v]).collect());
        let mut dst = Samples::filled(8, src.len(), 0).unwrap();
        let xf = Transform::new(&ctx, &p, 8, &p, 8, Tonemap::Auto).unwrap();
        xf.run(&src, &mut dst).unwrap();
        for i in 0..src.len() {
            assert!((src.get(i) as i32 - dst.get(i) as i32).abs() <= 1, "sample {i}");
        }
        // alpha is carried exactly
        for i in (3..src.len()).step_by(4) {
            assert_eq!(src.get(i), dst.get(i));
        }
    }

    #[test]
    fn direct_requantizes_alpha() {
        let ctx = Context::new().with_jobs(1);
        let p = gamma(2.2, 100);
        let src = Samples::U8(vec![0, 0, 0, 128]);
        let mut dst = Samples::filled(16, 4, 0).unwrap();
        Transform::new(&ctx, &p, 8, &p, 16, Tonemap::Auto)
            .unwrap()
            .run(&src, &mut dst)
            .unwrap();
        assert_eq!(dst.get(3), 128 * 257);
    }

    #[test]
    fn clip_without_tonemap() {
        let ctx = Context::new().with_jobs(2);
        let xf = Transform::new(&ctx, &linear(400), 16, &linear(100), 8, Tonemap::Off).unwrap();
        let linear_in = vec![0.1f32, 0.2, 0.3, 1.0, 0.0, 0.0, 0.0, 0.5];
        let mut scaled = linear_in.clone();
        xf.luminance_scale().apply_rgba(&mut scaled);
        let mut dst = Samples::filled(8, 8, 0).unwrap();
        xf.from_linear(&scaled, &mut dst).unwrap();

        let expected = [0.4f32, 0.8, 1.2];
        for (c, e) in expected.iter().enumerate() {
            let want = (e.clamp(0.0, 1.0) * 255.0).round() as i32;
            assert!((dst.get(c) as i32 - want).abs() <= 1, "channel {c}: {} vs {want}", dst.get(c));
        }
        assert_eq!(dst.get(3), 255);
        assert_eq!(dst.get(7), 128);
    }

    #[test]
    fn tonemap_scenario() {
        // 1000 nit source into a 100 nit destination: scale 10, AUTO enables tonemap
        let ctx = Context::new().with_jobs(4);
        let xf = Transform::new(&ctx, &linear(1000), 16, &linear(100), 8, Tonemap::Auto).unwrap();
        let scale = xf.luminance_scale();
        assert!(scale.tonemap());
        assert_eq!(scale.scale(), 10.0);

        let mut buf = vec![0.05f32, 0.05, 0.05, 1.0, 0.5, 0.5, 0.5, 1.0];
        scale.apply_rgba(&mut buf);
        let mut dst = Samples::filled(8, 8, 0).unwrap();
        xf.from_linear(&buf, &mut dst).unwrap();

        assert_eq!(dst.get(0), 128);
        let bright = dst.get(4);
        assert!(bright < 255 && bright > 128, "{bright}");
    }

    #[test]
    fn linear_roundtrip_same_profile() {
        let ctx = Context::new().with_jobs(2);
        let p = gamma(2.2, 100);
        let xf = Transform::new(&ctx, &p, 16, &p, 16, Tonemap::Off).unwrap();
        let raw = RawImage::new(4, 1, 16).unwrap();
        let lin = xf.to_linear(&raw.samples).unwrap();
        assert!(lin.iter().all(|v| (v - 1.0).abs() < 1e-3));
        let back = xf.from_linear_new(&lin).unwrap();
        assert_eq!(back, raw.samples);
    }

    #[test]
    fn jobs_do_not_change_output() {
        let src_p = gamma(2.2, 300);
        let dst_p = gamma(2.4, 100);
        let src = Samples::U16((0..4000u32).map(|v| (v * 16) as u16).collect());
        let mut outputs = Vec::new();
        for jobs in [1, 4, 16] {
            let ctx = Context::new().with_jobs(jobs);
            let xf = Transform::new(&ctx, &src_p, 16, &dst_p, 16, Tonemap::Auto).unwrap();
            let mut dst = Samples::filled(16, src.len(), 0).unwrap();
            xf.run(&src, &mut dst).unwrap();
            outputs.push(dst);
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[1], outputs[2]);
    }
}

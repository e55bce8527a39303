//! ICC profile wrapper.

use std::fmt;
use std::path::Path;

use glam::Vec3;
use lcms2::{
    CIEXYZ, CIExyY, CIExyYTRIPLE, InfoType, Locale, MLU, Profile as LcmsProfile, Tag, TagSignature,
    ToneCurve,
};
use lumen_core::DEFAULT_LUMINANCE;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::curve::{pq_eotf, Curve, CurveKind};
use crate::primaries::{xy_to_xyz, xyz_to_xy, Primaries, D50};
use crate::tags::{self, TagInfo};
use crate::{IccError, IccResult};

/// What [`Profile::query`] reports: primaries, curve and reference luminance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileInfo {
    /// Chromaticities
    pub primaries: Primaries,
    /// Transfer curve
    pub curve: Curve,
    /// Reference max luminance in nits, [`DEFAULT_LUMINANCE`] when the profile has none
    pub luminance: u32,
}

/// Well-known transfer curves detected by shape rather than by the generic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCurve {
    /// SMPTE ST 2084 perceptual quantizer
    Pq,
}

/// An RGB ICC profile.
///
/// Wraps an lcms2 handle together with its serialized bytes and a SHA-256
/// content signature. The bytes are what gets embedded in files and what
/// worker threads parse to build their own transforms.
///
/// # Example
///
/// ```rust
/// use lumen_icc::{Curve, Primaries, Profile};
///
/// let p3 = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), Some(300), None).unwrap();
/// let info = p3.query().unwrap();
/// assert_eq!(info.luminance, 300);
/// assert!(info.primaries.approx_eq(&Primaries::P3, 1e-3));
/// ```
pub struct Profile {
    pub(crate) inner: LcmsProfile,
    bytes: Vec<u8>,
    signature: [u8; 32],
}

impl Profile {
    /// Parses raw ICC bytes.
    pub fn parse(data: &[u8]) -> IccResult<Self> {
        let inner = LcmsProfile::new_icc(data).map_err(|e| IccError::InvalidProfile(e.to_string()))?;
        Ok(Self::with_bytes(inner, data.to_vec()))
    }

    /// Loads an `.icc` file.
    pub fn from_file(path: &Path) -> IccResult<Self> {
        let data = std::fs::read(path)?;
        let profile = Self::parse(&data)
            .map_err(|e| IccError::InvalidProfile(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), size = data.len(), description = %profile.description(), "profile loaded");
        Ok(profile)
    }

    /// lcms2's built-in sRGB profile.
    pub fn srgb() -> IccResult<Self> {
        Self::from_lcms(LcmsProfile::new_srgb())
    }

    /// Builds a profile from primaries, a gamma curve, an optional luminance
    /// and an optional description.
    ///
    /// A missing description is generated from the other parameters.
    pub fn synthesize(
        primaries: &Primaries,
        curve: &Curve,
        luminance: Option<u32>,
        description: Option<&str>,
    ) -> IccResult<Self> {
        primaries.validate()?;
        if curve.kind != CurveKind::Gamma || !(curve.gamma > 0.0) {
            return Err(IccError::InvalidParameters(format!(
                "cannot build a profile from curve {curve}, only simple gamma curves are supported"
            )));
        }
        let tone = ToneCurve::new(f64::from(curve.gamma));
        let description = match description {
            Some(d) => d.to_owned(),
            None => describe(primaries, curve, luminance.unwrap_or(DEFAULT_LUMINANCE)),
        };
        let profile = Self::build(primaries, &tone, luminance, &description)?;
        debug!(%description, %curve, luminance, size = profile.bytes.len(), "profile synthesized");
        Ok(profile)
    }

    pub(crate) fn build(
        primaries: &Primaries,
        tone: &ToneCurve,
        luminance: Option<u32>,
        description: &str,
    ) -> IccResult<Self> {
        let xy_y = |xy: [f32; 2]| CIExyY { x: f64::from(xy[0]), y: f64::from(xy[1]), Y: 1.0 };
        let white = xy_y(primaries.white);
        let triple = CIExyYTRIPLE {
            Red: xy_y(primaries.red),
            Green: xy_y(primaries.green),
            Blue: xy_y(primaries.blue),
        };
        let curves = [tone, tone, tone];
        let mut inner = LcmsProfile::new_rgb(&white, &triple, &curves)
            .map_err(|e| IccError::CreateFailed(e.to_string()))?;
        if let Some(nits) = luminance.filter(|&l| l > 0) {
            write_luminance(&mut inner, nits)?;
        }
        write_text(&mut inner, TagSignature::ProfileDescriptionTag, description)?;
        Self::from_lcms(inner)
    }

    /// Serializes a freshly built handle and reopens it from the bytes, so a
    /// profile reads the same (s15Fixed16 quantized) values as its clones.
    fn from_lcms(inner: LcmsProfile) -> IccResult<Self> {
        let bytes = inner.icc().map_err(|e| IccError::CreateFailed(e.to_string()))?;
        Self::parse(&bytes)
    }

    fn with_bytes(inner: LcmsProfile, bytes: Vec<u8>) -> Self {
        let signature = Sha256::digest(&bytes).into();
        Self { inner, bytes, signature }
    }

    /// Re-serializes after an in-place edit.
    fn refresh(&mut self) -> IccResult<()> {
        let bytes = self.inner.icc().map_err(|e| IccError::CreateFailed(e.to_string()))?;
        *self = Self::parse(&bytes)?;
        Ok(())
    }

    /// Deep copy with an independent lcms2 handle.
    pub fn try_clone(&self) -> IccResult<Self> {
        Self::parse(&self.bytes)
    }

    /// Serialized ICC bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Profile description, empty when missing.
    pub fn description(&self) -> String {
        self.inner
            .info(InfoType::Description, Locale::none())
            .unwrap_or_default()
    }

    /// Profile copyright, if present.
    pub fn copyright(&self) -> Option<String> {
        self.inner
            .info(InfoType::Copyright, Locale::none())
            .filter(|s| !s.is_empty())
    }

    /// Replaces the description tag.
    pub fn set_description(&mut self, text: &str) -> IccResult<()> {
        write_text(&mut self.inner, TagSignature::ProfileDescriptionTag, text)?;
        self.refresh()
    }

    /// Replaces the copyright tag.
    pub fn set_copyright(&mut self, text: &str) -> IccResult<()> {
        write_text(&mut self.inner, TagSignature::CopyrightTag, text)?;
        self.refresh()
    }

    /// Replaces the luminance tag.
    pub fn set_luminance(&mut self, nits: u32) -> IccResult<()> {
        if nits == 0 {
            return Err(IccError::InvalidParameters("luminance must be positive".into()));
        }
        write_luminance(&mut self.inner, nits)?;
        self.refresh()
    }

    /// Luminance tag in nits, `None` when absent.
    pub fn luminance(&self) -> Option<u32> {
        match self.inner.read_tag(TagSignature::LuminanceTag) {
            Tag::CIEXYZ(xyz) if xyz.Y > 0.0 => Some(xyz.Y.round() as u32),
            _ => None,
        }
    }

    /// SHA-256 of the serialized profile.
    pub fn signature(&self) -> [u8; 32] {
        self.signature
    }

    /// [`signature`](Self::signature) as lowercase hex.
    pub fn signature_hex(&self) -> String {
        self.signature.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Primaries, curve and luminance, or an error; never a partial answer.
    pub fn query(&self) -> IccResult<ProfileInfo> {
        let primaries = self.primaries()?;
        let curve = self.curve()?;
        let luminance = self.luminance().unwrap_or(DEFAULT_LUMINANCE);
        Ok(ProfileInfo { primaries, curve, luminance })
    }

    /// Chromaticities from the colorant tags, with chromatic adaptation undone.
    pub fn primaries(&self) -> IccResult<Primaries> {
        let read_xyz = |sig| match self.inner.read_tag(sig) {
            Tag::CIEXYZ(xyz) => Some(Vec3::new(xyz.X as f32, xyz.Y as f32, xyz.Z as f32)),
            _ => None,
        };
        let (Some(mut r), Some(mut g), Some(mut b)) = (
            read_xyz(TagSignature::RedColorantTag),
            read_xyz(TagSignature::GreenColorantTag),
            read_xyz(TagSignature::BlueColorantTag),
        ) else {
            return Err(IccError::Unsupported("profile has no RGB colorant tags".into()));
        };
        let mut w = read_xyz(TagSignature::MediaWhitePointTag).unwrap_or_else(|| xy_to_xyz(D50));

        if let Some(chad) = tags::chromatic_adaptation(&self.bytes) {
            if chad.determinant().abs() > 1e-8 {
                let undo = chad.inverse();
                r = undo * r;
                g = undo * g;
                b = undo * b;
                w = undo * w;
            }
        }

        let xy = |v: Vec3, what: &str| {
            xyz_to_xy(v).ok_or_else(|| IccError::Unsupported(format!("{what} colorant is zero")))
        };
        Ok(Primaries::new(xy(r, "red")?, xy(g, "green")?, xy(b, "blue")?, xy(w, "white")?))
    }

    /// Red TRC reduced to a [`Curve`].
    pub fn curve(&self) -> IccResult<Curve> {
        let Tag::ToneCurve(tone) = self.inner.read_tag(TagSignature::RedTRCTag) else {
            return Err(IccError::Unsupported("profile has no red TRC".into()));
        };
        let implicit_scale = tone.eval(1.0f32);
        let estimate = tone.estimated_gamma(1.0).unwrap_or(0.0) as f32;
        if tone.parametric_type() == 1 {
            let gamma = (estimate * 10000.0).round() / 10000.0;
            Ok(Curve { kind: CurveKind::Gamma, gamma, implicit_scale })
        } else {
            Ok(Curve { kind: CurveKind::Complex, gamma: estimate, implicit_scale })
        }
    }

    /// True when the analytic fast path can replace lcms2 for this profile.
    pub fn ccmm_compatible(&self) -> bool {
        self.query()
            .map(|q| q.curve.is_simple_gamma() && q.primaries.is_valid())
            .unwrap_or(false)
    }

    /// Primaries of this profile if its curve matches a well-known special curve.
    pub fn special_primaries(&self, kind: SpecialCurve) -> Option<Primaries> {
        let Tag::ToneCurve(tone) = self.inner.read_tag(TagSignature::RedTRCTag) else {
            return None;
        };
        let matches = match kind {
            SpecialCurve::Pq => [0.1f32, 0.25, 0.5, 0.75, 0.9]
                .iter()
                .all(|&x| (tone.eval(x) - pq_eotf(x)).abs() < 2e-3),
        };
        if !matches {
            return None;
        }
        let primaries = self.primaries().ok();
        debug!(?kind, ?primaries, "special curve detected");
        primaries
    }

    /// Tag directory, for diagnostics.
    pub fn tags(&self) -> IccResult<Vec<TagInfo>> {
        tags::tag_table(&self.bytes)
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("description", &self.description())
            .field("size", &self.bytes.len())
            .field("luminance", &self.luminance())
            .finish()
    }
}

/// Default description for a synthesized profile, e.g. `Lumen P3 2.2g 300nits`.
pub fn describe(primaries: &Primaries, curve: &Curve, luminance: u32) -> String {
    let name = primaries.stock_name().unwrap_or("Custom");
    format!("Lumen {name} {}g {luminance}nits", curve.gamma)
}

fn write_text(inner: &mut LcmsProfile, sig: TagSignature, text: &str) -> IccResult<()> {
    let mut mlu = MLU::new(1);
    if !mlu.set_text(text, Locale::new("en_US")) {
        return Err(IccError::CreateFailed(format!("cannot encode text for {sig:?}")));
    }
    if inner.write_tag(sig, Tag::MLU(&mlu)) {
        Ok(())
    } else {
        Err(IccError::CreateFailed(format!("failed to write {sig:?}")))
    }
}

fn write_luminance(inner: &mut LcmsProfile, nits: u32) -> IccResult<()> {
    let xyz = CIEXYZ { X: 0.0, Y: f64::from(nits), Z: 0.0 };
    if inner.write_tag(TagSignature::LuminanceTag, Tag::CIEXYZ(&xyz)) {
        Ok(())
    } else {
        Err(IccError::CreateFailed("failed to write luminance tag".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn synthesize_and_query() {
        let profile =
            Profile::synthesize(&Primaries::BT2020, &Curve::gamma(2.4), Some(1000), Some("test")).unwrap();
        assert_eq!(profile.description(), "test");
        let info = profile.query().unwrap();
        assert_eq!(info.curve.kind, CurveKind::Gamma);
        assert_abs_diff_eq!(info.curve.gamma, 2.4, epsilon = 1e-3);
        assert_abs_diff_eq!(info.curve.implicit_scale, 1.0, epsilon = 1e-4);
        assert_eq!(info.luminance, 1000);
        assert!(info.primaries.approx_eq(&Primaries::BT2020, 2e-3));
        assert!(profile.ccmm_compatible());
    }

    #[test]
    fn default_luminance_applies() {
        let profile = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.2), None, None).unwrap();
        assert_eq!(profile.luminance(), None);
        assert_eq!(profile.query().unwrap().luminance, DEFAULT_LUMINANCE);
        assert_eq!(profile.description(), "Lumen BT709 2.2g 100nits");
    }

    #[test]
    fn srgb_is_complex() {
        let srgb = Profile::srgb().unwrap();
        let info = srgb.query().unwrap();
        assert_eq!(info.curve.kind, CurveKind::Complex);
        assert!(info.curve.gamma > 2.0 && info.curve.gamma < 2.5);
        assert!(info.primaries.approx_eq(&Primaries::BT709, 2e-3));
        assert!(!srgb.ccmm_compatible());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Profile::synthesize(&Primaries::default(), &Curve::gamma(2.2), None, None).is_err());
        assert!(Profile::synthesize(&Primaries::P3, &Curve::gamma(0.0), None, None).is_err());
        assert!(Profile::synthesize(&Primaries::P3, &Curve::default(), None, None).is_err());
    }

    #[test]
    fn clone_is_independent() {
        let original = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), Some(300), None).unwrap();
        let mut copy = original.try_clone().unwrap();
        assert_eq!(copy.signature(), original.signature());
        copy.set_copyright("Someone").unwrap();
        copy.set_luminance(500).unwrap();
        assert_eq!(copy.copyright().as_deref(), Some("Someone"));
        assert_eq!(copy.luminance(), Some(500));
        assert_eq!(original.luminance(), Some(300));
        assert_ne!(copy.signature(), original.signature());
    }

    #[test]
    fn roundtrip_bytes() {
        let profile = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), Some(300), None).unwrap();
        let parsed = Profile::parse(profile.to_bytes()).unwrap();
        assert_eq!(parsed.signature(), profile.signature());
        assert_eq!(parsed.query().unwrap(), profile.query().unwrap());
        assert!(Profile::parse(b"not a profile").is_err());
    }

    #[test]
    fn clones_query_identically() {
        let mut profile = Profile::synthesize(&Primaries::BT2020, &Curve::gamma(2.4), Some(1000), None).unwrap();
        assert_eq!(profile.try_clone().unwrap().query().unwrap(), profile.query().unwrap());

        profile.set_luminance(400).unwrap();
        let copy = profile.try_clone().unwrap();
        assert_eq!(copy.query().unwrap(), profile.query().unwrap());
        assert_eq!(copy.signature(), profile.signature());

        let srgb = Profile::srgb().unwrap();
        assert_eq!(srgb.try_clone().unwrap().query().unwrap(), srgb.query().unwrap());
    }

    #[test]
    fn tag_listing() {
        let profile = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), Some(300), None).unwrap();
        let tags = profile.tags().unwrap();
        for sig in ["desc", "rXYZ", "rTRC", "lumi"] {
            assert!(tags.iter().any(|t| t.signature == sig), "missing {sig}");
        }
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p3.icc");
        let profile = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), None, None).unwrap();
        std::fs::write(&path, profile.to_bytes()).unwrap();
        let loaded = Profile::from_file(&path).unwrap();
        assert_eq!(loaded.description(), profile.description());
    }
}

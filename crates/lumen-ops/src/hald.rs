//! HALD CLUT application.
//!
//! A HALD image of level `n` is `n^3` pixels square and stores a cube of
//! `n^2` entries per axis, red varying fastest, then green, then blue.
//! Lookups interpolate trilinearly between the eight surrounding entries.

use lumen_core::{run_ranges, to_linear_float, write_linear_float, RawImage, Samples};
use tracing::{debug, info};

use crate::{Context, Image, OpsError, OpsResult};

/// Entries per axis of the cube stored in `hald`.
///
/// The image must be square with `dims^3 == width * height`.
pub fn hald_dims(hald: &RawImage) -> OpsResult<usize> {
    let count = hald.pixel_count();
    let dims = (count as f64).cbrt().round() as usize;
    if hald.width != hald.height || dims < 2 || dims * dims * dims != count {
        return Err(OpsError::InvalidInput(format!(
            "{}x{} image is not a HALD CLUT",
            hald.width, hald.height
        )));
    }
    Ok(dims)
}

/// Trilinear lookup into a normalized RGBA HALD table.
fn lookup(table: &[f32], dims: usize, rgb: [f32; 3]) -> [f32; 3] {
    let max = (dims - 1) as f32;
    let mut base = [0usize; 3];
    let mut frac = [0.0f32; 3];
    for c in 0..3 {
        let v = rgb[c].clamp(0.0, 1.0) * max;
        let i = (v.floor() as usize).min(dims - 2);
        base[c] = i;
        frac[c] = v - i as f32;
    }

    let entry = |r: usize, g: usize, b: usize| {
        let idx = 4 * (r + g * dims + b * dims * dims);
        [table[idx], table[idx + 1], table[idx + 2]]
    };

    let mut out = [0.0f32; 3];
    for corner in 0..8usize {
        let dr = corner & 1;
        let dg = (corner >> 1) & 1;
        let db = (corner >> 2) & 1;
        let w = (if dr == 1 { frac[0] } else { 1.0 - frac[0] })
            * (if dg == 1 { frac[1] } else { 1.0 - frac[1] })
            * (if db == 1 { frac[2] } else { 1.0 - frac[2] });
        if w == 0.0 {
            continue;
        }
        let e = entry(base[0] + dr, base[1] + dg, base[2] + db);
        for c in 0..3 {
            out[c] += e[c] * w;
        }
    }
    out
}

/// Runs every pixel of `image` through `hald`, keeping alpha.
///
/// Values are looked up in the normalized encoded domain of the source,
/// which is the domain HALD tables are authored in.
pub(crate) fn apply_hald(ctx: &Context, image: &Image, hald: &Image) -> OpsResult<Image> {
    let dims = hald_dims(hald.raw())?;
    info!(dims, "applying HALD CLUT");
    let table = to_linear_float(hald.samples(), hald.depth())?;
    let src = to_linear_float(image.samples(), image.depth())?;
    let mut dst = vec![0.0f32; src.len()];

    run_ranges(ctx.tasks(), &src, 4, &mut dst, 4, |_, input, out| {
        for (s, d) in input.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
            let rgb = lookup(&table, dims, [s[0], s[1], s[2]]);
            d[..3].copy_from_slice(&rgb);
            d[3] = s[3];
        }
        Ok::<(), OpsError>(())
    })?;

    let mut samples = Samples::filled(image.depth(), src.len(), 0)?;
    write_linear_float(&dst, image.depth(), &mut samples);
    let raw = RawImage::from_samples(image.width(), image.height(), image.depth(), samples)?;
    debug!(pixels = raw.pixel_count(), "HALD applied");
    Image::from_parts(raw, image.profile().try_clone()?)
}

//! Human-readable diagnostics for profiles and images, logged at `info`.

use lumen_core::Rect;
use lumen_icc::{Profile, SpecialCurve};
use tracing::{info, warn};

use crate::Image;

/// Logs the profile summary, optionally with its tag directory.
pub fn dump_profile(profile: &Profile, with_tags: bool) {
    let info = match profile.query() {
        Ok(info) => info,
        Err(e) => {
            warn!(error = %e, "profile \"{}\" cannot be queried", profile.description());
            return;
        }
    };
    let p = &info.primaries;
    info!("Profile \"{}\"", profile.description());
    info!("  Size: {} bytes", profile.to_bytes().len());
    if let Some(copyright) = profile.copyright() {
        info!("  Copyright: \"{copyright}\"");
    }
    info!(
        "  Primaries: (r:{:.4},{:.4} g:{:.4},{:.4} b:{:.4},{:.4} w:{:.4},{:.4})",
        p.red[0], p.red[1], p.green[0], p.green[1], p.blue[0], p.blue[1], p.white[0], p.white[1]
    );
    info!("  Max Luminance: {}", info.luminance);
    info!("  Curve: {}", info.curve);
    if (info.curve.implicit_scale - 1.0).abs() > 1e-4 {
        info!("  Implicit matrix curve scale: {}", info.curve.implicit_scale);
        info!("  Actual max luminance: {}", info.luminance as f32 * info.curve.implicit_scale);
    }
    info!("  CCMM friendly: {}", profile.ccmm_compatible());
    info!("  SHA-256: {}", profile.signature_hex());
    if let Some(pq) = profile.special_primaries(SpecialCurve::Pq) {
        info!(
            "  PQ: (r:{:.4},{:.4} g:{:.4},{:.4} b:{:.4},{:.4} w:{:.4},{:.4})",
            pq.red[0], pq.red[1], pq.green[0], pq.green[1], pq.blue[0], pq.blue[1], pq.white[0], pq.white[1]
        );
    }

    if with_tags {
        match profile.tags() {
            Ok(tags) if !tags.is_empty() => {
                info!("  Tags [{}]:", tags.len());
                for (i, tag) in tags.iter().enumerate() {
                    info!("    Tag {i:2} [{:5} bytes]: {}", tag.size, tag.signature);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "cannot list tags"),
        }
    }
}

/// Logs geometry and profile of `image`, plus pixel values inside `rect`.
pub fn dump_image(image: &Image, rect: Option<Rect>) {
    info!("Image: {}x{} {}bpc", image.width(), image.height(), image.depth());
    dump_profile(image.profile(), false);

    let Some(rect) = rect else { return };
    let r = match rect.adjust(image.width(), image.height()) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "pixel rect ignored");
            return;
        }
    };
    info!("  Pixels [{},{} {}x{}]:", r.x, r.y, r.w, r.h);
    for y in r.y as u32..(r.y + r.h) as u32 {
        for x in r.x as u32..(r.x + r.w) as u32 {
            let px = image.raw().pixel(x, y);
            info!("    [{x:4},{y:4}] ({:5}, {:5}, {:5}, {:5})", px[0], px[1], px[2], px[3]);
        }
    }
}

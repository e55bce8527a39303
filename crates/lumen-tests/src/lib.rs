//! Integration tests for lumen crates.
//!
//! End-to-end checks that decode, convert and encode through real files,
//! crossing every crate boundary.

#[cfg(test)]
mod tests {
    use std::path::Path;

    use lumen_core::{Rect, Samples, Tonemap};
    use lumen_icc::{Curve, Primaries, Profile, StockProfile};
    use lumen_io::WriteParams;
    use lumen_ops::convert::{self, ConvertOutput};
    use lumen_ops::report::{write_json, ImageReport};
    use lumen_ops::{Context, ConversionParams, Filter, Image, ResizeSpec};
    use sha2::{Digest, Sha256};
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32, depth: u32, profile: &Profile) -> Image {
        let mut image = Image::create(width, height, depth, Some(profile)).unwrap();
        let max = if depth == 8 { 255u32 } else { 65535 };
        for y in 0..height {
            for x in 0..width {
                let r = x * max / (width - 1);
                let g = y * max / (height - 1);
                let b = (x + y) * max / (width + height - 2);
                image.set_pixel(x, y, [r as u16, g as u16, b as u16, max as u16]).unwrap();
            }
        }
        image
    }

    fn hash_samples(samples: &Samples) -> String {
        let mut hasher = Sha256::new();
        match samples {
            Samples::U8(v) => hasher.update(v),
            Samples::U16(v) => v.iter().for_each(|s| hasher.update(s.to_le_bytes())),
        }
        hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }

    fn run_convert(ctx: &Context, input: &Path, output: &Path, params: &ConversionParams) -> Image {
        let format = convert::output_format(ctx, output, params.format.as_deref()).unwrap();
        let (src, _) = Image::read(ctx, input, None).unwrap();
        let src = convert::prepare_source(ctx, src, params).unwrap();
        let result = convert::convert(ctx, &src, params, format).unwrap();
        result.write(ctx, output, format, params).unwrap();
        let (back, _) = Image::read(ctx, output, None).unwrap();
        back
    }

    /// PNG -> BT.2020 PQ-free HDR to SDR -> PNG, checking the embedded profile.
    #[test]
    fn test_png_hdr_to_sdr_roundtrip() {
        let ctx = Context::new().with_jobs(4);
        let dir = tempdir().unwrap();
        let input = dir.path().join("hdr.png");
        let output = dir.path().join("sdr.png");

        let hdr = Profile::synthesize(&Primaries::BT2020, &Curve::gamma(2.4), Some(1000), None).unwrap();
        gradient(64, 32, 16, &hdr).write(&ctx, &input, "png", &WriteParams::default()).unwrap();

        let params = ConversionParams {
            primaries: Some(Primaries::BT709),
            luminance: 100,
            gamma: 2.2,
            depth: 8,
            ..Default::default()
        };
        let back = run_convert(&ctx, &input, &output, &params);

        assert_eq!((back.width(), back.height(), back.depth()), (64, 32, 8));
        let info = back.profile().query().unwrap();
        assert_eq!(info.luminance, 100);
        assert!(info.primaries.approx_eq(&Primaries::BT709, 1e-3));
        // black stays black, white is tonemapped below full scale
        assert_eq!(back.pixel(0, 0).unwrap()[..3], [0, 0, 0]);
        let white = back.pixel(63, 31).unwrap();
        assert!(white[0] > 200 && white[0] < 255, "{white:?}");
    }

    #[test]
    fn test_output_independent_of_jobs() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let p3 = StockProfile::P3.to_profile().unwrap();
        let ctx = Context::new();
        gradient(50, 37, 16, &p3).write(&ctx, &input, "png", &WriteParams::default()).unwrap();

        let params = ConversionParams {
            luminance: 80,
            primaries: Some(Primaries::BT2020),
            resize: Some(ResizeSpec { width: 31, height: 0, filter: Filter::Auto }),
            tonemap: Tonemap::On,
            ..Default::default()
        };
        let mut hashes = Vec::new();
        for jobs in [1, 3, 16] {
            let ctx = Context::new().with_jobs(jobs);
            let output = dir.path().join(format!("out{jobs}.png"));
            let back = run_convert(&ctx, &input, &output, &params);
            hashes.push(hash_samples(back.samples()));
        }
        assert_eq!(hashes[0], hashes[1]);
        assert_eq!(hashes[1], hashes[2]);
    }

    #[test]
    fn test_jpeg_forces_eight_bits() {
        let ctx = Context::new();
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.jpg");
        gradient(16, 16, 16, &Profile::srgb().unwrap())
            .write(&ctx, &input, "png", &WriteParams::default())
            .unwrap();

        let params = ConversionParams { depth: 16, quality: 95, ..Default::default() };
        let back = run_convert(&ctx, &input, &output, &params);
        assert_eq!(back.depth(), 8);
        assert_eq!(back.profile().description(), Profile::srgb().unwrap().description());
    }

    #[test]
    fn test_icc_output_and_override() {
        let ctx = Context::new();
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let icc = dir.path().join("out.icc");
        gradient(8, 8, 8, &Profile::srgb().unwrap())
            .write(&ctx, &input, "png", &WriteParams::default())
            .unwrap();

        let params = ConversionParams {
            gamma: 2.4,
            luminance: 200,
            copyright: Some("CC0".into()),
            ..Default::default()
        };
        let format = convert::output_format(&ctx, &icc, None).unwrap();
        let (src, _) = Image::read(&ctx, &input, None).unwrap();
        let result = convert::convert(&ctx, &src, &params, format).unwrap();
        assert!(matches!(result, ConvertOutput::Profile(_)));
        result.write(&ctx, &icc, format, &params).unwrap();

        let written = Profile::from_file(&icc).unwrap();
        assert_eq!(written.luminance(), Some(200));
        assert_eq!(written.copyright().as_deref(), Some("CC0"));

        // reading with the profile as an override
        let (tagged, _) = Image::read(&ctx, &input, Some(&icc)).unwrap();
        assert_eq!(tagged.profile().signature(), written.signature());
    }

    #[test]
    fn test_crop_hald_pipeline() {
        let ctx = Context::new().with_jobs(2);
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let hald = dir.path().join("hald.png");
        let output = dir.path().join("out.png");

        let src = gradient(20, 20, 8, &Profile::srgb().unwrap());
        src.write(&ctx, &input, "png", &WriteParams::default()).unwrap();
        Image::hald_identity(4, 16, None)
            .unwrap()
            .write(&ctx, &hald, "png", &WriteParams::default())
            .unwrap();

        let params = ConversionParams {
            rect: Some(Rect::new(5, 5, 100, 100)),
            hald: Some(hald),
            ..Default::default()
        };
        let back = run_convert(&ctx, &input, &output, &params);
        assert_eq!((back.width(), back.height()), (15, 15));
        for (x, y) in [(0, 0), (7, 3), (14, 14)] {
            let a = src.pixel(x + 5, y + 5).unwrap();
            let b = back.pixel(x, y).unwrap();
            for c in 0..4 {
                assert!((a[c] as i32 - b[c] as i32).abs() <= 1, "({x},{y}) {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_report_file() {
        let ctx = Context::new();
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("report.json");
        let profile = Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), Some(1000), None).unwrap();
        gradient(10, 10, 16, &profile).write(&ctx, &input, "png", &WriteParams::default()).unwrap();

        let (image, _) = Image::read(&ctx, &input, None).unwrap();
        write_json(&output, &ImageReport::new(&ctx, &input, &image).unwrap()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["width"], 10);
        assert_eq!(json["icc"]["luminance"], 1000);
        let max = json["luminance"]["maxNits"].as_f64().unwrap();
        assert!(max > 900.0 && max < 1100.0, "{max}");
        assert!(json["luminance"]["aboveSdr"].as_f64().unwrap() > 0.0);
    }
}

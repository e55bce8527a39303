//! Identify command: image and profile details, logged or as JSON.

use anyhow::Result;
use lumen_ops::dump::{dump_image, dump_profile};
use lumen_ops::report::IdentifyReport;
use lumen_ops::Context;

use crate::IdentifyArgs;

/// Runs the identify command.
///
/// `.icc` inputs show only the profile.
pub fn run(args: IdentifyArgs, ctx: &Context) -> Result<()> {
    let rect = args.rect.as_deref().map(super::parse_rect).transpose()?;
    let (image, format) = super::load_image(ctx, &args.input, args.icc_in.as_deref())?;

    if args.json {
        let report = IdentifyReport::new(&args.input, format, &image, rect)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tracing::info!("lumen [identify]: {} ({format})", args.input.display());
    if format == "icc" {
        dump_profile(image.profile(), true);
    } else {
        dump_image(&image, rect);
        if args.tags {
            dump_profile(image.profile(), true);
        }
    }
    Ok(())
}

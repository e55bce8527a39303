//! Modify command: edit profile metadata in place, pixels untouched.

use anyhow::{bail, Context as _, Result};
use lumen_io::WriteParams;
use lumen_ops::{convert, Context};
use tracing::info;

use crate::ModifyArgs;

/// Runs the modify command.
pub fn run(args: ModifyArgs, ctx: &Context) -> Result<()> {
    if args.description.is_none() && args.copyright.is_none() && args.luminance.is_none() {
        bail!("Nothing to modify: give a description, copyright or luminance");
    }
    let format = convert::output_format(ctx, &args.output, None)?;
    let (mut image, _) = super::load_image(ctx, &args.input, None)?;
    info!("lumen [modify]: {} -> {}", args.input.display(), args.output.display());

    let profile = image.profile_mut();
    if let Some(description) = &args.description {
        info!("Setting description: \"{description}\"");
        profile.set_description(description)?;
    }
    if let Some(copyright) = &args.copyright {
        info!("Setting copyright: \"{copyright}\"");
        profile.set_copyright(copyright)?;
    }
    if let Some(luminance) = args.luminance {
        info!("Setting luminance: {luminance}");
        profile.set_luminance(luminance)?;
    }

    let saved = if format == convert::ICC_FORMAT {
        lumen_io::write_atomic(&args.output, image.profile().to_bytes()).map_err(Into::into)
    } else {
        image.write(ctx, &args.output, format, &WriteParams::default())
    };
    saved.with_context(|| format!("Failed to save: {}", args.output.display()))
}

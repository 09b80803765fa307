//! Render one of the built-in test scenes to a PNG.
//!
//! ```text
//! cargo run --release --example render_test_scene -- cornell_box out.png [settings.json]
//! ```
//!
//! The scene may be given by name or index. A settings file overrides the
//! scene's own integrator, sampler and background. Set `RUST_LOG=debug` for
//! per-bucket progress.

use std::fs;

use anyhow::{bail, Context, Result};
use log::info;
use umbra_renderer::test_scenes::{test_scene, TEST_SCENES};
use umbra_renderer::RenderSettings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let scene_arg = args.next().unwrap_or_else(|| TEST_SCENES[4].to_string());
    let output = args.next().unwrap_or_else(|| format!("{}.png", scene_arg));
    let settings_path = args.next();

    let index = match scene_arg.parse::<usize>() {
        Ok(index) => index,
        Err(_) => match TEST_SCENES.iter().position(|name| *name == scene_arg) {
            Some(index) => index,
            None => bail!("unknown scene '{}', expected one of {:?}", scene_arg, TEST_SCENES),
        },
    };

    let mut builder = test_scene(index)?;
    if let Some(path) = settings_path {
        let json = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
        let settings = RenderSettings::from_json_str(&json).with_context(|| format!("parsing {}", path))?;
        builder.apply_settings(&settings);
    }

    let scene = builder.build()?;
    let image = scene.render();

    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .context("image buffer size does not match its dimensions")?;
    rgba.save(&output).with_context(|| format!("writing {}", output))?;
    info!("Saved {}", output);

    Ok(())
}

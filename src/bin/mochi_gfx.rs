//! Mochi Graphics Demo
//!
//! Probes the terminal, builds a test pattern out of a few planes and
//! renders it through the compositor.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use mochi_graphics::animation::{Animation, StopSignal, ThreadSleeper};
use mochi_graphics::blitter::{self, GraphicsContent};
use mochi_graphics::caps::{CapabilityProbe, CapabilityProvider};
use mochi_graphics::color::ColorChannel;
use mochi_graphics::compositor::{Compositor, PlaneContent, PlaneSpec};
use mochi_graphics::config::GraphicsConfig;
use mochi_graphics::visual::{PixelFormat, Visual};
use mochi_graphics::BlitterType;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PATTERN_COLS: u32 = 32;
const PATTERN_ROWS: u32 = 12;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut preferred: Option<String> = None;
    let mut no_query = false;
    let mut show_caps = false;
    let mut show_snapshot = false;
    let mut animate = false;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            },
            "-b" | "--blitter" => {
                i += 1;
                if i < args.len() {
                    preferred = Some(args[i].clone());
                }
            },
            "--no-query" => no_query = true,
            "--caps" => show_caps = true,
            "--snapshot" => show_snapshot = true,
            "-a" | "--animate" => animate = true,
            "-h" | "--help" => show_help = true,
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                return ExitCode::FAILURE;
            },
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let mut config = match GraphicsConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        },
    };
    if no_query {
        config.probe.active_query = false;
    }
    if let Some(name) = preferred {
        match name.parse::<BlitterType>() {
            Ok(b) => config.render.force_blitter = Some(b),
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            },
        }
    }

    let mut probe = CapabilityProbe::new(&config.probe);
    if show_caps {
        let caps = probe.detect();
        match caps.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize capabilities: {}", e);
                return ExitCode::FAILURE;
            },
        }
        let supported: Vec<&str> = blitter::supported_list(caps)
            .iter()
            .map(|b| b.name())
            .collect();
        println!("supported blitters: {}", supported.join(", "));
        return ExitCode::SUCCESS;
    }

    let mut compositor = match Compositor::try_new(Box::new(probe), config) {
        Ok(compositor) => compositor,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        },
    };
    if let Err(e) = build_scene(&mut compositor) {
        eprintln!("Failed to build scene: {}", e);
        return ExitCode::FAILURE;
    }

    if show_snapshot {
        match compositor.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        }
        return ExitCode::SUCCESS;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    // Clear screen, home cursor
    let _ = out.write_all(b"\x1b[2J\x1b[H");

    let result = if animate {
        let fade = Animation::fade(
            ColorChannel::rgb(255, 255, 255),
            0,
            160,
            24,
            Duration::from_millis(40),
        );
        compositor
            .animate_fill("overlay", &fade, &mut out, &mut ThreadSleeper, &StopSignal::new())
            .map(|_| compositor.last_stats())
    } else {
        compositor.render_all(&mut out)
    };

    // Park the cursor below the pattern
    let _ = write!(out, "\x1b[{};1H", PATTERN_ROWS + 2);
    let _ = out.flush();

    match result {
        Ok(stats) => {
            tracing::info!(?stats, "rendered");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Render failed: {}", e);
            ExitCode::FAILURE
        },
    }
}

/// Diagonal RGB gradient
fn test_pattern(width: u32, height: u32) -> mochi_graphics::Result<Visual> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.push((x * 255 / width.max(1)) as u8);
            data.push((y * 255 / height.max(1)) as u8);
            data.push(((x + y) * 255 / (width + height).max(1)) as u8);
        }
    }
    Visual::new(width, height, PixelFormat::Rgb, data)
}

fn build_scene(compositor: &mut Compositor) -> mochi_graphics::Result<()> {
    compositor.create_plane(PlaneSpec::new("background", 0, 0, PATTERN_COLS, PATTERN_ROWS))?;
    compositor.set_content(
        "background",
        PlaneContent::Fill(ColorChannel::rgb(24, 24, 32)),
    )?;

    compositor.create_plane(
        PlaneSpec::new("image", 2, 1, PATTERN_COLS - 4, PATTERN_ROWS - 4)
            .z_index(1)
            .parent("background"),
    )?;
    compositor.set_content(
        "image",
        PlaneContent::visual(
            test_pattern(128, 64)?,
            GraphicsContent::image().with_multi_color(true),
        ),
    )?;

    compositor.create_plane(
        PlaneSpec::new("overlay", 6, 3, PATTERN_COLS - 12, PATTERN_ROWS - 8)
            .z_index(2)
            .transparent(true),
    )?;
    compositor.set_content(
        "overlay",
        PlaneContent::Fill(ColorChannel::new(255, 255, 255, 96)),
    )?;

    compositor.create_plane(
        PlaneSpec::new("chart", 0, PATTERN_ROWS - 2, PATTERN_COLS, 2).z_index(3),
    )?;
    let chart = Visual::new(
        8,
        2,
        PixelFormat::Rgba,
        [255u8, 200, 0, 255].repeat(16),
    )?;
    compositor.set_content("chart", PlaneContent::visual(chart, GraphicsContent::chart()))?;
    Ok(())
}

fn print_help() {
    println!(
        r#"Mochi Graphics Demo

Renders a test pattern using the best graphics the terminal supports.

USAGE:
    mochi-gfx [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Config file (TOML)
    -b, --blitter <NAME>    Prefer a blitter (pixel, sextant, quadrant,
                            half-block, braille, ascii)
        --no-query          Detect from the environment only
        --caps              Print detected capabilities and exit
        --snapshot          Print the plane tree as JSON and exit
    -a, --animate           Fade the overlay in
    -h, --help              Print help

ENVIRONMENT:
    RUST_LOG                    Log filter (default: warn)
    MOCHI_GFX_PROBE_TIMEOUT_MS  Capability query timeout
    MOCHI_GFX_ACTIVE_QUERY      0 to skip the terminal query
    MOCHI_GFX_CHUNK_SIZE        Kitty chunk size
    MOCHI_GFX_SIXEL_COLORS      Sixel palette size
    MOCHI_GFX_BLITTER           Preferred blitter
"#
    );
}

//! End-to-end scenarios for the graphics subsystem
//!
//! These drive the public API the way an application would: synthetic
//! capability sets go in, escape sequences come out.

use mochi_graphics::blitter::{self, GraphicsContent};
use mochi_graphics::caps::{
    detect_from_env, CapabilityProbe, CapabilityProvider, MapEnv, StaticCapabilities,
};
use mochi_graphics::color::{self, AccessibilityLevel, ColorChannel};
use mochi_graphics::compositor::{Compositor, PlaneContent, PlaneSpec};
use mochi_graphics::config::{GraphicsConfig, ProbeConfig};
use mochi_graphics::protocol::{KittyEncoder, PackingMode, SixelEncoder, UploadFormat};
use mochi_graphics::{BlitterType, TerminalCapabilities, Visual};

fn caps_with(f: impl FnOnce(&mut TerminalCapabilities)) -> TerminalCapabilities {
    let mut caps = TerminalCapabilities::conservative();
    f(&mut caps);
    caps
}

/// Split a kitty stream into control strings
fn kitty_controls(out: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(out)
        .split("\x1b\\")
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_start_matches("\x1b_G")
                .split(';')
                .next()
                .unwrap_or("")
                .to_string()
        })
        .collect()
}

#[test]
fn chart_with_colors_prefers_quadrants_over_half_blocks() {
    let caps = caps_with(|c| {
        c.quadrants = true;
        c.unicode = true;
    });
    let content = GraphicsContent::chart().with_multi_color(true);
    assert_eq!(blitter::select(&content, &caps), BlitterType::Quadrant);
}

#[test]
fn image_with_pixel_transport_always_wins() {
    let caps = caps_with(|c| {
        c.kitty_graphics = true;
        c.sextants = true;
        c.quadrants = true;
        c.unicode = true;
    });
    let content = GraphicsContent::image()
        .with_high_detail(true)
        .with_multi_color(true);
    assert_eq!(blitter::select(&content, &caps), BlitterType::PixelTransport);
}

#[test]
fn supported_list_ends_with_ascii() {
    let list = blitter::supported_list(&TerminalCapabilities::conservative());
    assert_eq!(list, vec![BlitterType::AsciiFallback]);
}

#[test]
fn z_index_change_reorders_planes() {
    let mut comp = Compositor::new(
        Box::new(StaticCapabilities::default()),
        GraphicsConfig::default(),
    );
    comp.create_plane(PlaneSpec::new("bg", 0, 0, 10, 5)).unwrap();
    comp.create_plane(PlaneSpec::new("mid", 0, 0, 10, 5).z_index(1))
        .unwrap();
    comp.create_plane(PlaneSpec::new("fg", 0, 0, 10, 5).z_index(2))
        .unwrap();
    comp.set_z_index("bg", 5).unwrap();
    assert_eq!(comp.render_order(), vec!["mid", "fg", "bg"]);
}

#[test]
fn ten_thousand_bytes_make_three_chunks() {
    let mut encoder = KittyEncoder::new(4096);
    let mut out = Vec::new();
    encoder
        .upload(&mut out, &vec![0xAB; 10_000], UploadFormat::Png)
        .unwrap();

    let controls = kitty_controls(&out);
    assert_eq!(controls.len(), 3);
    assert!(controls[0].contains("m=1"));
    assert!(controls[0].contains("f=100"));
    assert!(controls[0].contains("s=10000"));
    assert!(controls[2].contains("m=0"));
    assert!(!controls[2].contains("f="));
    assert!(!controls[2].contains("s="));
}

#[test]
fn white_on_black_is_maximum_contrast() {
    let ratio = color::contrast_ratio(ColorChannel::WHITE, ColorChannel::BLACK);
    assert!((ratio - 21.0).abs() < 1e-9);
    assert!(color::meets_accessibility_threshold(
        ColorChannel::WHITE,
        ColorChannel::BLACK,
        AccessibilityLevel::Aaa
    ));
}

#[test]
fn probe_without_tty_uses_environment() {
    let env = MapEnv::from([("TERM", "xterm-kitty"), ("LANG", "C.UTF-8")]);
    let config = ProbeConfig {
        active_query: false,
        ..ProbeConfig::default()
    };
    let mut probe = CapabilityProbe::with_sources(Box::new(env), None, &config);
    let caps = probe.detect().clone();
    assert!(caps.kitty_graphics);
    assert!(caps.truecolor());
    assert_eq!(
        caps,
        detect_from_env(&MapEnv::from([("TERM", "xterm-kitty"), ("LANG", "C.UTF-8")]))
    );
}

#[test]
fn sixel_terminal_renders_image_plane_as_sixel() {
    let caps = caps_with(|c| {
        c.sixel_graphics = true;
        c.unicode = true;
        c.color_bits = 8;
        c.max_colors = 256;
    });
    let mut config = GraphicsConfig::default();
    config.render.cell_width_px = 2;
    config.render.cell_height_px = 3;
    let mut comp = Compositor::new(Box::new(StaticCapabilities(caps)), config);
    comp.create_plane(PlaneSpec::new("photo", 0, 0, 2, 2)).unwrap();
    comp.set_content(
        "photo",
        PlaneContent::visual(
            Visual::solid(8, 8, ColorChannel::rgb(255, 0, 0)),
            GraphicsContent::image(),
        ),
    )
    .unwrap();

    let mut out = Vec::new();
    let stats = comp.render_all(&mut out).unwrap();
    let text = String::from_utf8_lossy(&out);
    assert_eq!(stats.pixel_planes, 1);
    assert!(text.contains("\x1bPq"));
    // Register 0 is the image colour and is the one drawn
    assert!(text.contains("\x1bPq#0;2;100;0;0#0"));
    assert!(!text.contains("#1;"));
    // 4x6 pixels: one strip, four columns fully lit
    assert!(text.contains("#0~~~~\x1b\\"));
}

#[test]
fn ascii_terminal_still_renders() {
    let mut comp = Compositor::new(
        Box::new(StaticCapabilities(TerminalCapabilities::conservative())),
        GraphicsConfig::default(),
    );
    comp.create_plane(PlaneSpec::new("pic", 0, 0, 3, 1)).unwrap();
    comp.set_content(
        "pic",
        PlaneContent::visual(Visual::solid(3, 1, ColorChannel::WHITE), GraphicsContent::image()),
    )
    .unwrap();
    let mut out = Vec::new();
    let stats = comp.render_all(&mut out).unwrap();
    assert_eq!(stats.failures, 0);
    assert_eq!(String::from_utf8_lossy(&out).matches('@').count(), 3);
}

#[test]
fn forced_blitter_falls_back_when_unsupported() {
    let mut config = GraphicsConfig::default();
    config.render.force_blitter = Some(BlitterType::Sextant);
    let caps = caps_with(|c| {
        c.unicode = true;
        c.half_blocks = true;
        c.color_bits = 24;
    });
    let mut comp = Compositor::new(Box::new(StaticCapabilities(caps)), config);
    comp.create_plane(PlaneSpec::new("p", 0, 0, 1, 1)).unwrap();
    comp.set_content(
        "p",
        PlaneContent::visual(Visual::solid(1, 2, ColorChannel::WHITE), GraphicsContent::image()),
    )
    .unwrap();
    let mut out = Vec::new();
    comp.render_all(&mut out).unwrap();
    assert!(String::from_utf8_lossy(&out).contains('█'));
}

#[test]
fn per_color_sixel_from_config() {
    let config =
        GraphicsConfig::from_toml("[sixel]\npacking = \"per-color\"\nmax_colors = 8\n").unwrap();
    let encoder = SixelEncoder::from_config(&config.sixel);
    assert_eq!(encoder.packing(), PackingMode::PerColor);
    let out = encoder.encode_visual(&Visual::solid(2, 6, ColorChannel::rgb(0, 0, 255)));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("#0;2;0;0;100#0~~$"));
}

#[test]
fn capabilities_json_roundtrip() {
    let caps = caps_with(|c| c.max_chunk_size = Some(2048));
    let json = caps.to_json().unwrap();
    assert_eq!(TerminalCapabilities::from_json(&json).unwrap(), caps);
}

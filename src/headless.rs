// Headless Module - Renders a fixed number of frames offscreen and writes a PNG snapshot
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::input::InputBridge;
use crate::led_output::connect_led_output;
use crate::palette::Palette;
use crate::renderer::{session_rng, CancelToken, LoopState, RenderLoop};
use crate::scheduler::FrameQueue;
use crate::surface::{Canvas, Surface};
use crate::types::ModeExitReason;

/// Summary of one headless run
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessReport {
    pub frames: u64,
    pub particles: usize,
    pub cancelled: bool,
}

/// Scripted pointer path: a Lissajous sweep across the middle of the surface
pub fn pointer_path(frame: u64, width: u32, height: u32) -> (f64, f64) {
    let t = frame as f64 * 0.05;
    let x = width as f64 * (0.5 + 0.4 * (t * 1.3).sin());
    let y = height as f64 * (0.5 + 0.4 * (t * 0.7).cos());
    (x, y)
}

/// Drive the render loop for up to `config.headless_frames` ticks. Samples
/// along `pointer_path` are fed between frames. Tripping `interrupt`
/// cancels the session, which ends at its next frame. `frame` receives the
/// last presented frame: the scene with the trail and cursor on top.
pub fn render_frames(config: &AppConfig, frame: &mut Surface, interrupt: &CancelToken) -> Result<HeadlessReport> {
    let theme = config.theme();
    let palette = Palette::from_config(config, theme)?;
    let mut queue = FrameQueue::new();
    let mut render_loop = RenderLoop::new(session_rng(config.seed));
    render_loop.set_show_cursor(config.show_cursor);
    let mut bridge = InputBridge::new();
    bridge.attach();

    // Starts deferred until the resize gives the scene its area
    let mut surface = Surface::new();
    render_loop.start(surface.bounds(), theme, palette, &mut queue);
    debug!(deferred = render_loop.is_deferred(), "session requested");
    bridge.on_viewport_resize(&mut surface, &mut render_loop, &mut queue, config.headless_width, config.headless_height);
    frame.clone_from(&surface);

    let mut led_output = connect_led_output(config);
    let (width, height) = surface.dimensions();
    let mut frames = 0;
    let mut cancelled = false;

    while frames < config.headless_frames {
        if interrupt.is_cancelled() {
            if let Some(token) = render_loop.cancel_token() {
                token.cancel();
            }
        }
        // A few pointer samples per frame, as a real pointer would deliver
        for step in 0..3 {
            let (x, y) = pointer_path(frames * 3 + step, width, height);
            bridge.on_pointer_move(&mut render_loop, x, y);
        }
        let Some(handle) = queue.next_due() else {
            break;
        };
        if render_loop.on_frame(handle, &mut surface, &mut queue).is_none() {
            cancelled = render_loop.state() == LoopState::Stopped;
            break;
        }
        frame.clone_from(&surface);
        render_loop.draw_overlay(frame);
        if let Some(output) = led_output.as_mut() {
            output.send_surface(frame, palette.backdrop);
        }
        frames += 1;
    }

    let particles = render_loop.trail().len();
    debug!(
        ticks = render_loop.ticks(),
        grid_offset = ?render_loop.grid_offset(),
        orbs = render_loop.orbs().len(),
        "headless session finished"
    );
    render_loop.stop(&mut queue);
    bridge.detach();
    Ok(HeadlessReport { frames, particles, cancelled })
}

pub fn write_snapshot(surface: &Surface, palette: &Palette, path: &Path) -> Result<()> {
    let (width, height) = surface.dimensions();
    let image = RgbImage::from_raw(width, height, surface.to_rgb8(palette.backdrop))
        .context("surface buffer does not match its dimensions")?;
    image
        .save(path)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    Ok(())
}

pub fn run_headless_mode(config: &AppConfig) -> Result<ModeExitReason> {
    let interrupt = CancelToken::default();
    let handler_token = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        // Already installed by an earlier headless run in this process
        warn!("Ctrl-C handler not installed: {}", e);
    }

    info!(
        width = config.headless_width,
        height = config.headless_height,
        frames = config.headless_frames,
        theme = %config.theme,
        "headless render started"
    );

    let mut frame = Surface::new();
    let report = render_frames(config, &mut frame, &interrupt)?;
    if report.cancelled {
        info!(frames = report.frames, "interrupted, writing snapshot early");
    }

    let palette = Palette::from_config(config, config.theme())?;
    let path = Path::new(&config.snapshot_path);
    write_snapshot(&frame, &palette, path)?;
    info!(frames = report.frames, particles = report.particles, path = %path.display(), "snapshot written");

    Ok(ModeExitReason::UserQuit)
}

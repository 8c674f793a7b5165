// LED Output Module - Streams the composited surface to a WLED matrix over DDP
use anyhow::{Context, Result};
use ddp_rs::connection::DDPConnection;
use ddp_rs::protocol::{PixelConfig, ID};
use std::net::UdpSocket;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::surface::Surface;
use crate::types::Rgb;

// WLED DDP timeout is ~1 second, so send keepalive every 500ms to be safe
const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(500);

const DDP_PORT: u16 = 4048;

/// Matrix geometry and output scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixLayout {
    pub width: usize,
    pub height: usize,
    /// Odd rows are wired right to left
    pub serpentine: bool,
    pub brightness: f64,
}

impl MatrixLayout {
    pub fn from_config(config: &AppConfig) -> Self {
        MatrixLayout {
            width: config.matrix_width,
            height: config.matrix_height,
            serpentine: config.matrix_serpentine,
            brightness: config.global_brightness,
        }
    }

    pub fn led_count(&self) -> usize {
        self.width * self.height
    }

    fn led_index(&self, x: usize, y: usize) -> usize {
        if self.serpentine && y % 2 == 1 {
            y * self.width + (self.width - 1 - x)
        } else {
            y * self.width + x
        }
    }
}

/// Downsample the surface onto the matrix and pack it as RGB bytes in
/// LED wiring order, brightness applied.
pub fn matrix_frame(surface: &Surface, backdrop: Rgb, layout: &MatrixLayout) -> Vec<u8> {
    let mut frame = vec![0u8; layout.led_count() * 3];
    if !surface.is_drawable() {
        return frame;
    }

    let cells = surface.downsample(layout.width, layout.height, backdrop);
    for y in 0..layout.height {
        for x in 0..layout.width {
            let Rgb { r, g, b } = cells[y * layout.width + x];
            let idx = layout.led_index(x, y) * 3;
            frame[idx] = r;
            frame[idx + 1] = g;
            frame[idx + 2] = b;
        }
    }
    apply_brightness(&mut frame, layout.brightness);
    frame
}

pub fn apply_brightness(frame: &mut [u8], brightness: f64) {
    if brightness >= 1.0 {
        return;
    }
    let brightness = brightness.max(0.0);
    for val in frame.iter_mut() {
        *val = (*val as f64 * brightness).round() as u8;
    }
}

/// Connect the LED matrix if enabled. A device that cannot be reached is
/// logged and the run continues without it.
pub fn connect_led_output(config: &AppConfig) -> Option<LedMatrixOutput> {
    if !config.wled_enabled || config.wled_ip.is_empty() {
        return None;
    }
    match LedMatrixOutput::connect(&config.wled_ip, MatrixLayout::from_config(config)) {
        Ok(output) => Some(output),
        Err(e) => {
            warn!("LED matrix output disabled: {:#}", e);
            None
        }
    }
}

/// A single WLED device fed with whole matrix frames
pub struct LedMatrixOutput {
    ip: String,
    layout: MatrixLayout,
    connection: DDPConnection,
    last_send_time: Instant,
}

impl LedMatrixOutput {
    pub fn connect(ip: &str, layout: MatrixLayout) -> Result<Self> {
        let dest_addr = format!("{}:{}", ip, DDP_PORT);
        let socket = UdpSocket::bind("0.0.0.0:0").context("binding DDP socket")?;
        let connection = DDPConnection::try_new(&dest_addr, PixelConfig::default(), ID::Default, socket)
            .with_context(|| format!("connecting to WLED at {}", dest_addr))?;
        info!(%dest_addr, width = layout.width, height = layout.height, "LED matrix output connected");

        Ok(LedMatrixOutput {
            ip: ip.to_string(),
            layout,
            connection,
            last_send_time: Instant::now(),
        })
    }

    pub fn set_layout(&mut self, layout: MatrixLayout) {
        self.layout = layout;
    }

    /// Send one frame. All-black frames are skipped unless a keepalive is
    /// due. Failures are logged and returned as false.
    pub fn send_surface(&mut self, surface: &Surface, backdrop: Rgb) -> bool {
        let frame = matrix_frame(surface, backdrop, &self.layout);
        let needs_keepalive = self.last_send_time.elapsed() >= KEEPALIVE_INTERVAL;
        if frame.iter().all(|&b| b == 0) && !needs_keepalive {
            return true;
        }

        match self.connection.write(&frame) {
            Ok(_) => {
                self.last_send_time = Instant::now();
                true
            }
            Err(e) => {
                warn!(ip = %self.ip, error = %e, "failed to send frame");
                false
            }
        }
    }
}

// Surface Module - Drawable pixel surface sized to the viewport
use crate::types::{Rgb, Rgba};

/// Drawable extent in pixels, as seen by physics and drawing code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Bounds { width, height }
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// One color stop of a radial gradient, offset in 0.0..=1.0 of the radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba,
}

/// Drawing primitives the render loop composes a frame from.
/// Every call composites source-over onto what is already there.
pub trait Canvas {
    fn bounds(&self) -> Bounds;

    /// Fill the whole surface
    fn fill(&mut self, color: Rgba);

    /// 1px vertical line spanning the full height, centred on `x`
    fn stroke_vertical(&mut self, x: f64, color: Rgba);

    /// 1px horizontal line spanning the full width, centred on `y`
    fn stroke_horizontal(&mut self, y: f64, color: Rgba);

    /// Disc of `radius` filled with a radial gradient from the centre outwards
    fn fill_radial(&mut self, cx: f64, cy: f64, radius: f64, stops: &[GradientStop]);

    /// Axis-aligned square of side `size` centred on (cx, cy)
    fn fill_square(&mut self, cx: f64, cy: f64, size: f64, color: Rgba);

    /// Circle outline of `radius` with the given line width
    fn stroke_ring(&mut self, cx: f64, cy: f64, radius: f64, width: f64, color: Rgba);
}

/// Pixel surface owned by the host. Stores premultiplied RGBA so that
/// repeated low-alpha washes accumulate the way a 2D canvas does.
#[derive(Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Surface {
    /// A surface with no drawable area yet (host not ready)
    pub fn new() -> Self {
        Surface { width: 0, height: 0, pixels: Vec::new() }
    }

    pub fn initialize(&mut self, viewport_width: u32, viewport_height: u32) {
        self.resize(viewport_width, viewport_height);
    }

    /// Adopt new dimensions. Raster content is discarded even when the size
    /// is unchanged, the same as assigning a canvas its width.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, [0.0; 4]);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Straight-alpha color of one pixel, transparent when out of range
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        if x >= self.width || y >= self.height {
            return Rgba::TRANSPARENT;
        }
        let [r, g, b, a] = self.pixels[(y * self.width + x) as usize];
        if a <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        Rgba { r: r / a, g: g / a, b: b / a, a }
    }

    /// Flatten the surface over an opaque backdrop into packed RGB bytes
    pub fn to_rgb8(&self, backdrop: Rgb) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for px in &self.pixels {
            let (r, g, b) = flatten(px, backdrop);
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }

    /// Area-average the flattened surface into a `cols x rows` grid of colors.
    /// Used for terminal cells and LED matrices, both far coarser than the surface.
    pub fn downsample(&self, cols: usize, rows: usize, backdrop: Rgb) -> Vec<Rgb> {
        let mut out = Vec::with_capacity(cols * rows);
        if cols == 0 || rows == 0 {
            return out;
        }
        let w = self.width as usize;
        let h = self.height as usize;

        for row in 0..rows {
            let y0 = row * h / rows;
            let y1 = ((row + 1) * h / rows).max(y0 + 1).min(h);
            for col in 0..cols {
                let x0 = col * w / cols;
                let x1 = ((col + 1) * w / cols).max(x0 + 1).min(w);

                let mut acc = [0u32; 3];
                let mut count = 0u32;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let (r, g, b) = flatten(&self.pixels[y * w + x], backdrop);
                        acc[0] += r as u32;
                        acc[1] += g as u32;
                        acc[2] += b as u32;
                        count += 1;
                    }
                }

                if count == 0 {
                    out.push(backdrop);
                } else {
                    out.push(Rgb {
                        r: (acc[0] / count) as u8,
                        g: (acc[1] / count) as u8,
                        b: (acc[2] / count) as u8,
                    });
                }
            }
        }
        out
    }

    // Source-over with partial pixel coverage
    fn blend(&mut self, x: usize, y: usize, src: [f32; 4], coverage: f32) {
        if coverage <= 0.0 {
            return;
        }
        let idx = y * self.width as usize + x;
        let dst = &mut self.pixels[idx];
        let sa = src[3] * coverage;
        let keep = 1.0 - sa;
        dst[0] = src[0] * coverage + dst[0] * keep;
        dst[1] = src[1] * coverage + dst[1] * keep;
        dst[2] = src[2] * coverage + dst[2] * keep;
        dst[3] = sa + dst[3] * keep;
    }

    // Coverage of the two pixel columns (or rows) a 1px line centred on `pos` touches
    fn line_coverage(pos: f64, limit: usize) -> Vec<(usize, f32)> {
        let start = pos - 0.5;
        let first = start.floor();
        let frac = (start - first) as f32;
        let mut cells = Vec::with_capacity(2);
        for (cell, cov) in [(first, 1.0 - frac), (first + 1.0, frac)] {
            if cell >= 0.0 && (cell as usize) < limit && cov > 0.0 {
                cells.push((cell as usize, cov));
            }
        }
        cells
    }

    fn clip_span(lo: f64, hi: f64, limit: u32) -> Option<(usize, usize)> {
        let lo = lo.floor().max(0.0);
        let hi = hi.ceil().min(limit as f64);
        if hi <= lo {
            return None;
        }
        Some((lo as usize, hi as usize))
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for Surface {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.width as f64, self.height as f64)
    }

    fn fill(&mut self, color: Rgba) {
        let src = color.premultiplied();
        let keep = 1.0 - src[3];
        for px in self.pixels.iter_mut() {
            px[0] = src[0] + px[0] * keep;
            px[1] = src[1] + px[1] * keep;
            px[2] = src[2] + px[2] * keep;
            px[3] = src[3] + px[3] * keep;
        }
    }

    fn stroke_vertical(&mut self, x: f64, color: Rgba) {
        let src = color.premultiplied();
        for (col, cov) in Self::line_coverage(x, self.width as usize) {
            for y in 0..self.height as usize {
                self.blend(col, y, src, cov);
            }
        }
    }

    fn stroke_horizontal(&mut self, y: f64, color: Rgba) {
        let src = color.premultiplied();
        for (row, cov) in Self::line_coverage(y, self.height as usize) {
            for x in 0..self.width as usize {
                self.blend(x, row, src, cov);
            }
        }
    }

    fn fill_radial(&mut self, cx: f64, cy: f64, radius: f64, stops: &[GradientStop]) {
        if radius <= 0.0 || stops.is_empty() {
            return;
        }
        let Some((x0, x1)) = Self::clip_span(cx - radius, cx + radius, self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip_span(cy - radius, cy + radius, self.height) else {
            return;
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let t = (dx * dx + dy * dy).sqrt() / radius;
                if t > 1.0 {
                    continue;
                }
                let src = sample_gradient(stops, t);
                self.blend(x, y, src, 1.0);
            }
        }
    }

    fn fill_square(&mut self, cx: f64, cy: f64, size: f64, color: Rgba) {
        let half = size / 2.0;
        let Some((x0, x1)) = Self::clip_span(cx - half, cx + half, self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip_span(cy - half, cy + half, self.height) else {
            return;
        };
        let src = color.premultiplied();
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, src, 1.0);
            }
        }
    }

    fn stroke_ring(&mut self, cx: f64, cy: f64, radius: f64, width: f64, color: Rgba) {
        let outer = radius + width / 2.0;
        let inner = (radius - width / 2.0).max(0.0);
        let Some((x0, x1)) = Self::clip_span(cx - outer, cx + outer, self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip_span(cy - outer, cy + outer, self.height) else {
            return;
        };
        let src = color.premultiplied();
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d >= inner && d <= outer {
                    self.blend(x, y, src, 1.0);
                }
            }
        }
    }
}

fn flatten(px: &[f32; 4], backdrop: Rgb) -> (u8, u8, u8) {
    let keep = 1.0 - px[3];
    let channel = |premul: f32, back: u8| -> u8 {
        ((premul + back as f32 / 255.0 * keep) * 255.0).round().clamp(0.0, 255.0) as u8
    };
    (channel(px[0], backdrop.r), channel(px[1], backdrop.g), channel(px[2], backdrop.b))
}

// Premultiplied interpolation between the surrounding stops
fn sample_gradient(stops: &[GradientStop], t: f64) -> [f32; 4] {
    let first = stops[0];
    if t <= first.offset {
        return first.color.premultiplied();
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let f = if span > 0.0 { ((t - a.offset) / span) as f32 } else { 1.0 };
            let pa = a.color.premultiplied();
            let pb = b.color.premultiplied();
            return [
                pa[0] + (pb[0] - pa[0]) * f,
                pa[1] + (pb[1] - pa[1]) * f,
                pa[2] + (pb[2] - pa[2]) * f,
                pa[3] + (pb[3] - pa[3]) * f,
            ];
        }
    }
    stops[stops.len() - 1].color.premultiplied()
}

// Terminal Module - Interactive host: half-block rendering, mouse-driven trail, live config
use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers, MouseEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::input::InputBridge;
use crate::led_output::{connect_led_output, MatrixLayout};
use crate::palette::Palette;
use crate::renderer::{session_rng, RenderLoop};
use crate::scheduler::FramePacer;
use crate::surface::{Canvas, Surface};
use crate::types::{ModeExitReason, Rgb, Theme};

const IDLE_POLL: Duration = Duration::from_millis(50);
const STATUS_ROWS: u16 = 1;

/// Surface size in pixels for a terminal of `cols x rows` cells. The
/// status row is excluded; each remaining cell holds two square pixels.
pub fn viewport_for(cols: u16, rows: u16, pixels_per_cell: f64) -> (u32, u32) {
    let rows = rows.saturating_sub(STATUS_ROWS);
    let width = (cols as f64 * pixels_per_cell).round() as u32;
    let height = (rows as f64 * 2.0 * pixels_per_cell).round() as u32;
    (width, height)
}

/// Pixel at the centre of a cell, or None on the status row
pub fn cell_to_pixel(col: u16, row: u16, rows: u16, pixels_per_cell: f64) -> Option<(f64, f64)> {
    if row >= rows.saturating_sub(STATUS_ROWS) {
        return None;
    }
    let x = (col as f64 + 0.5) * pixels_per_cell;
    let y = (row as f64 + 0.5) * 2.0 * pixels_per_cell;
    Some((x, y))
}

/// Downsampled surface drawn with upper-half blocks: fg is the top pixel,
/// bg the bottom one.
pub struct SurfaceView<'a> {
    cells: &'a [Rgb],
    cols: usize,
}

impl<'a> SurfaceView<'a> {
    pub fn new(cells: &'a [Rgb], cols: usize) -> Self {
        SurfaceView { cells, cols }
    }
}

impl Widget for SurfaceView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.cols == 0 {
            return;
        }
        let pixel_rows = self.cells.len() / self.cols;
        for row in 0..area.height as usize {
            let top_row = row * 2;
            if top_row >= pixel_rows {
                break;
            }
            for col in 0..(area.width as usize).min(self.cols) {
                let top = self.cells[top_row * self.cols + col];
                let bottom = self
                    .cells
                    .get((top_row + 1) * self.cols + col)
                    .copied()
                    .unwrap_or(top);
                buf.get_mut(area.x + col as u16, area.y + row as u16)
                    .set_char('▀')
                    .set_fg(Color::Rgb(top.r, top.g, top.b))
                    .set_bg(Color::Rgb(bottom.r, bottom.g, bottom.b));
            }
        }
    }
}

// Restores the terminal on every exit path, including errors and panics unwinding
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enabling raw mode")?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            disable_raw_mode().ok();
            return Err(e).context("entering alternate screen");
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(TerminalGuard { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        execute!(self.terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen).ok();
        disable_raw_mode().ok();
        self.terminal.show_cursor().ok();
    }
}

enum KeyAction {
    Quit,
    ToggleTheme,
    Restart,
    ClearTrail,
    None,
}

fn key_action(key: &KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('t') | KeyCode::Char('T') => KeyAction::ToggleTheme,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Restart,
        KeyCode::Char('c') | KeyCode::Char('C') => KeyAction::ClearTrail,
        _ => KeyAction::None,
    }
}

fn status_line(theme: Theme, fps: f64, orbs: usize, particles: usize, led: bool) -> Line<'static> {
    let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut spans = vec![
        Span::styled(" glowgrid ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(" {} | {:.0} fps | orbs {} | particles {:>2}", theme.as_str(), fps, orbs, particles)),
    ];
    if led {
        spans.push(Span::raw(" | LED"));
    }
    spans.extend([
        Span::raw("   "),
        Span::styled("t", key),
        Span::raw(" theme  "),
        Span::styled("r", key),
        Span::raw(" restart  "),
        Span::styled("c", key),
        Span::raw(" clear  "),
        Span::styled("q", key),
        Span::raw(" quit"),
    ]);
    Line::from(spans)
}

pub fn run_terminal_mode(config: &AppConfig, config_change_tx: broadcast::Sender<()>) -> Result<ModeExitReason> {
    let mut config_change_rx = config_change_tx.subscribe();
    let mut current_config = config.clone();

    let mut theme = current_config.theme();
    let mut palette = Palette::from_config(&current_config, theme)?;
    let mut led_output = connect_led_output(&current_config);

    let mut guard = TerminalGuard::enter()?;

    let (mut cols, mut rows) = crossterm::terminal::size().context("reading terminal size")?;
    let mut ppc = current_config.pixels_per_cell;
    let mut surface = Surface::new();
    // Presented copy of the scene with the trail and cursor on top
    let mut frame = Surface::new();
    let (width, height) = viewport_for(cols, rows, ppc);
    surface.initialize(width, height);

    let mut pacer = FramePacer::new(current_config.fps);
    let mut render_loop = RenderLoop::new(session_rng(current_config.seed));
    render_loop.set_show_cursor(current_config.show_cursor);
    let mut bridge = InputBridge::new();
    bridge.attach();
    render_loop.start(surface.bounds(), theme, palette, &mut pacer);
    info!(cols, rows, width, height, "terminal mode started");

    let exit = loop {
        // Config file changes
        if config_change_rx.try_recv().is_ok() {
            match AppConfig::load() {
                Ok(new_config) => {
                    if new_config.mode != "terminal" {
                        info!(mode = %new_config.mode, "mode changed, leaving terminal mode");
                        break ModeExitReason::ModeChanged;
                    }

                    if new_config.fps != current_config.fps {
                        pacer.set_fps(new_config.fps);
                    }
                    render_loop.set_show_cursor(new_config.show_cursor);

                    if new_config.pixels_per_cell != current_config.pixels_per_cell {
                        ppc = new_config.pixels_per_cell;
                        let (w, h) = viewport_for(cols, rows, ppc);
                        bridge.on_viewport_resize(&mut surface, &mut render_loop, &mut pacer, w, h);
                    }

                    let new_theme = new_config.theme();
                    match Palette::from_config(&new_config, new_theme) {
                        Ok(new_palette) => {
                            if new_theme != theme || new_palette != palette {
                                theme = new_theme;
                                palette = new_palette;
                                render_loop.restart(surface.bounds(), theme, palette, &mut pacer);
                            }
                        }
                        Err(e) => warn!("ignoring palette change: {:#}", e),
                    }

                    if new_config.wled_enabled != current_config.wled_enabled
                        || new_config.wled_ip != current_config.wled_ip
                    {
                        led_output = connect_led_output(&new_config);
                    } else if let Some(output) = led_output.as_mut() {
                        output.set_layout(MatrixLayout::from_config(&new_config));
                    }

                    current_config = new_config;
                }
                Err(e) => warn!("config reload failed: {:#}", e),
            }
        }

        // Block on input until the next frame is due
        let wait = pacer.time_until_due(Instant::now()).unwrap_or(IDLE_POLL);
        let mut quit = false;
        if event::poll(wait)? {
            // Drain everything queued so the frame sees every pointer sample
            loop {
                match event::read()? {
                    Event::Key(key) => match key_action(&key) {
                        KeyAction::Quit => quit = true,
                        KeyAction::ToggleTheme => {
                            theme = theme.toggled();
                            palette = Palette::from_config(&current_config, theme).unwrap_or_else(|e| {
                                warn!("bad {} palette override, using defaults: {:#}", theme.as_str(), e);
                                Palette::for_theme(theme)
                            });
                            render_loop.restart(surface.bounds(), theme, palette, &mut pacer);
                        }
                        KeyAction::Restart => {
                            render_loop.restart(surface.bounds(), theme, palette, &mut pacer);
                        }
                        KeyAction::ClearTrail => render_loop.trail_mut().clear(),
                        KeyAction::None => {}
                    },
                    Event::Mouse(mouse) => {
                        if matches!(mouse.kind, MouseEventKind::Moved | MouseEventKind::Drag(_)) {
                            if let Some((x, y)) = cell_to_pixel(mouse.column, mouse.row, rows, ppc) {
                                bridge.on_pointer_move(&mut render_loop, x, y);
                            }
                        }
                    }
                    Event::Resize(new_cols, new_rows) => {
                        cols = new_cols;
                        rows = new_rows;
                        let (w, h) = viewport_for(cols, rows, ppc);
                        bridge.on_viewport_resize(&mut surface, &mut render_loop, &mut pacer, w, h);
                    }
                    _ => {}
                }
                if quit || !event::poll(Duration::ZERO)? {
                    break;
                }
            }
        }
        if quit {
            break ModeExitReason::UserQuit;
        }

        let Some(handle) = pacer.poll(Instant::now()) else {
            continue;
        };
        if render_loop.on_frame(handle, &mut surface, &mut pacer).is_none() {
            continue;
        }

        frame.clone_from(&surface);
        render_loop.draw_overlay(&mut frame);

        if let Some(output) = led_output.as_mut() {
            output.send_surface(&frame, palette.backdrop);
        }

        let view_rows = rows.saturating_sub(STATUS_ROWS) as usize;
        let cells = frame.downsample(cols as usize, view_rows * 2, palette.backdrop);
        let shown_theme = render_loop.theme().unwrap_or(theme);
        let orbs = render_loop.orbs().len();
        let particles = render_loop.trail().len();
        let fps = current_config.fps;
        let has_led = led_output.is_some();
        guard.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(STATUS_ROWS)])
                .split(f.size());
            f.render_widget(SurfaceView::new(&cells, cols as usize), chunks[0]);
            f.render_widget(Paragraph::new(status_line(shown_theme, fps, orbs, particles, has_led)), chunks[1]);
        })?;
    };

    info!(?exit, ticks = render_loop.ticks(), "terminal mode finished");
    render_loop.stop(&mut pacer);
    bridge.detach();
    drop(guard);
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_excludes_status_row() {
        assert_eq!(viewport_for(100, 31, 8.0), (800, 480));
        assert_eq!(viewport_for(80, 1, 8.0), (640, 0));
        assert_eq!(viewport_for(0, 0, 8.0), (0, 0));
    }

    #[test]
    fn test_cell_to_pixel_centre() {
        assert_eq!(cell_to_pixel(0, 0, 31, 8.0), Some((4.0, 8.0)));
        assert_eq!(cell_to_pixel(10, 2, 31, 8.0), Some((84.0, 40.0)));
        // Status row is not part of the surface
        assert_eq!(cell_to_pixel(3, 30, 31, 8.0), None);
    }

    #[test]
    fn test_surface_view_half_blocks() {
        let red = Rgb { r: 255, g: 0, b: 0 };
        let blue = Rgb { r: 0, g: 0, b: 255 };
        // 2 columns, 2 pixel rows: top red, bottom blue
        let cells = [red, red, blue, blue];
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        SurfaceView::new(&cells, 2).render(area, &mut buf);

        let cell = buf.get(1, 0);
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn test_key_bindings() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(matches!(key_action(&ctrl_c), KeyAction::Quit));
        assert!(matches!(key_action(&plain_c), KeyAction::ClearTrail));
        let t = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE);
        assert!(matches!(key_action(&t), KeyAction::ToggleTheme));
    }
}

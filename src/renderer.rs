// Renderer Module - The render loop state machine driving the background animation
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::orb::{spawn_orbs, Orb};
use crate::palette::Palette;
use crate::particle::ParticleTrail;
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::surface::{Bounds, Canvas};
use crate::types::Theme;

/// Distance between grid lines in pixels
pub const GRID_SPACING: f64 = 50.0;

/// Grid phase advance per tick
pub const GRID_STEP: f64 = 0.5;

const CURSOR_RADIUS: f64 = 10.0;
const CURSOR_LINE_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Shared stop flag of one session. Tripping it from outside (e.g. a Ctrl-C
/// handler) ends the session at its next frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one tick drew
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub vertical_lines: usize,
    pub horizontal_lines: usize,
    pub orbs: usize,
    pub particles: usize,
}

/// Latest pointer sample in surface pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
    pub seen: bool,
}

// State of one start..stop span
struct Session {
    theme: Theme,
    palette: Palette,
    orbs: Vec<Orb>,
    grid_offset: f64,
    pending: Option<FrameHandle>,
    token: CancelToken,
    ticks: u64,
}

/// Generator for a render loop; seed 0 draws from OS entropy
pub fn session_rng(seed: u64) -> StdRng {
    if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    }
}

/// Positions of grid lines along an axis of `extent` pixels: every
/// `GRID_SPACING` starting one spacing before the wrapped offset.
pub fn grid_lines(offset: f64, extent: f64) -> impl Iterator<Item = f64> {
    let start = offset.rem_euclid(GRID_SPACING) - GRID_SPACING;
    (0..)
        .map(move |i| start + i as f64 * GRID_SPACING)
        .take_while(move |pos| *pos < extent)
}

/// Owns all animation state: the session's orbs and grid phase, the
/// pointer and the particle trail.
pub struct RenderLoop<R: Rng> {
    rng: R,
    session: Option<Session>,
    deferred: Option<(Theme, Palette)>,
    pointer: Pointer,
    trail: ParticleTrail,
    show_cursor: bool,
}

impl<R: Rng> RenderLoop<R> {
    pub fn new(rng: R) -> Self {
        RenderLoop {
            rng,
            session: None,
            deferred: None,
            pointer: Pointer::default(),
            trail: ParticleTrail::new(),
            show_cursor: true,
        }
    }

    pub fn set_show_cursor(&mut self, show: bool) {
        self.show_cursor = show;
    }

    pub fn state(&self) -> LoopState {
        if self.session.is_some() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Begin a session. On a surface with no area the start is remembered
    /// and activated by the first resize that makes it drawable; returns
    /// whether the loop is now running. Starting while running restarts.
    pub fn start<S: FrameScheduler + ?Sized>(
        &mut self,
        bounds: Bounds,
        theme: Theme,
        palette: Palette,
        scheduler: &mut S,
    ) -> bool {
        if self.session.is_some() {
            debug!("restarting running session");
            self.stop(scheduler);
        }

        if !bounds.is_drawable() {
            info!(theme = theme.as_str(), "surface not drawable, deferring start");
            self.deferred = Some((theme, palette));
            return false;
        }

        let orbs = spawn_orbs(&mut self.rng, bounds);
        let pending = scheduler.request_frame();
        self.session = Some(Session {
            theme,
            palette,
            orbs,
            grid_offset: 0.0,
            pending: Some(pending),
            token: CancelToken::default(),
            ticks: 0,
        });
        self.deferred = None;
        info!(
            theme = theme.as_str(),
            width = bounds.width,
            height = bounds.height,
            "render loop started"
        );
        true
    }

    /// Activate a deferred start once the surface has area
    pub fn resume_deferred<S: FrameScheduler + ?Sized>(&mut self, bounds: Bounds, scheduler: &mut S) -> bool {
        match self.deferred {
            Some((theme, palette)) if bounds.is_drawable() => self.start(bounds, theme, palette, scheduler),
            _ => false,
        }
    }

    /// End the session: cancel the pending frame and drop the orbs.
    /// The trail and pointer are kept.
    pub fn stop<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.deferred = None;
        if let Some(session) = self.session.take() {
            if let Some(handle) = session.pending {
                scheduler.cancel_frame(handle);
            }
            session.token.cancel();
            info!(ticks = session.ticks, "render loop stopped");
        }
    }

    /// Stop and start again with a new theme. Orbs are re-randomized.
    pub fn restart<S: FrameScheduler + ?Sized>(
        &mut self,
        bounds: Bounds,
        theme: Theme,
        palette: Palette,
        scheduler: &mut S,
    ) -> bool {
        self.stop(scheduler);
        self.start(bounds, theme, palette, scheduler)
    }

    /// Display refresh callback. Runs one tick for the pending frame and
    /// schedules the next; stale handles are ignored.
    pub fn on_frame<S, C>(&mut self, handle: FrameHandle, canvas: &mut C, scheduler: &mut S) -> Option<FrameStats>
    where
        S: FrameScheduler + ?Sized,
        C: Canvas + ?Sized,
    {
        let session = self.session.as_mut()?;
        if session.pending != Some(handle) {
            return None;
        }
        session.pending = None;

        if session.token.is_cancelled() {
            info!("session cancelled externally");
            self.stop(scheduler);
            return None;
        }

        let stats = self.tick(canvas);
        if let Some(session) = self.session.as_mut() {
            session.pending = Some(scheduler.request_frame());
        }
        Some(stats)
    }

    /// One frame of the persistent scene: wash, grid, orbs. The trail ages
    /// here too, but it is drawn by `draw_overlay` so that it never enters
    /// the washed raster. Nothing moves while the canvas has no area.
    pub fn tick<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> FrameStats {
        let mut stats = FrameStats::default();
        let Some(session) = self.session.as_mut() else {
            return stats;
        };
        let bounds = canvas.bounds();
        if !bounds.is_drawable() {
            return stats;
        }
        session.ticks += 1;

        canvas.fill(session.palette.wash);

        session.grid_offset += GRID_STEP;
        for x in grid_lines(session.grid_offset, bounds.width) {
            canvas.stroke_vertical(x, session.palette.grid);
            stats.vertical_lines += 1;
        }
        for y in grid_lines(session.grid_offset, bounds.height) {
            canvas.stroke_horizontal(y, session.palette.grid);
            stats.horizontal_lines += 1;
        }

        for orb in session.orbs.iter_mut() {
            orb.advance(bounds);
            orb.draw(canvas);
            stats.orbs += 1;
        }

        self.trail.advance();
        stats.particles = self.trail.len();
        stats
    }

    /// Trail markers and the cursor ring, composited onto the presented
    /// frame only. Returns the number of particles drawn.
    pub fn draw_overlay<C: Canvas + ?Sized>(&self, canvas: &mut C) -> usize {
        let Some(session) = self.session.as_ref() else {
            return 0;
        };
        let drawn = self.trail.draw(canvas, session.palette.particle);

        if self.show_cursor && self.pointer.seen {
            canvas.stroke_ring(
                self.pointer.x,
                self.pointer.y,
                CURSOR_RADIUS,
                CURSOR_LINE_WIDTH,
                session.palette.cursor,
            );
        }
        drawn
    }

    /// Record a pointer sample and roll for a trail particle
    pub fn pointer_moved(&mut self, x: f64, y: f64) -> Option<u64> {
        self.pointer = Pointer { x, y, seen: true };
        self.trail.maybe_spawn(x, y, &mut self.rng)
    }

    pub fn pointer(&self) -> Pointer {
        self.pointer
    }

    pub fn trail(&self) -> &ParticleTrail {
        &self.trail
    }

    pub fn trail_mut(&mut self) -> &mut ParticleTrail {
        &mut self.trail
    }

    /// Live orbs; empty while stopped
    pub fn orbs(&self) -> &[Orb] {
        self.session.as_ref().map(|s| s.orbs.as_slice()).unwrap_or(&[])
    }

    pub fn grid_offset(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.grid_offset)
    }

    pub fn theme(&self) -> Option<Theme> {
        self.session.as_ref().map(|s| s.theme)
    }

    pub fn ticks(&self) -> u64 {
        self.session.as_ref().map(|s| s.ticks).unwrap_or(0)
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Token of the running session, for hosts that stop from another thread
    pub fn cancel_token(&self) -> Option<CancelToken> {
        self.session.as_ref().map(|s| s.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orb::ORB_COUNT;
    use crate::scheduler::FrameQueue;
    use crate::surface::{GradientStop, Surface};
    use crate::types::Rgba;
    use rand::rngs::mock::StepRng;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Fill(Rgba),
        Vertical(f64),
        Horizontal(f64),
        Radial(f64, f64),
        Square(f64, f64, f32),
        Ring(f64, f64),
    }

    // Records draw calls instead of rasterizing
    struct Recorder {
        bounds: Bounds,
        ops: Vec<Op>,
    }

    impl Recorder {
        fn new(width: f64, height: f64) -> Self {
            Recorder { bounds: Bounds::new(width, height), ops: Vec::new() }
        }
    }

    impl Canvas for Recorder {
        fn bounds(&self) -> Bounds {
            self.bounds
        }
        fn fill(&mut self, color: Rgba) {
            self.ops.push(Op::Fill(color));
        }
        fn stroke_vertical(&mut self, x: f64, _color: Rgba) {
            self.ops.push(Op::Vertical(x));
        }
        fn stroke_horizontal(&mut self, y: f64, _color: Rgba) {
            self.ops.push(Op::Horizontal(y));
        }
        fn fill_radial(&mut self, cx: f64, cy: f64, _radius: f64, _stops: &[GradientStop]) {
            self.ops.push(Op::Radial(cx, cy));
        }
        fn fill_square(&mut self, cx: f64, cy: f64, _size: f64, color: Rgba) {
            self.ops.push(Op::Square(cx, cy, color.a));
        }
        fn stroke_ring(&mut self, cx: f64, cy: f64, _radius: f64, _width: f64, _color: Rgba) {
            self.ops.push(Op::Ring(cx, cy));
        }
    }

    fn seeded() -> RenderLoop<StdRng> {
        let mut rl = RenderLoop::new(session_rng(11));
        rl.set_show_cursor(false);
        rl
    }

    fn start_dark(rl: &mut RenderLoop<StdRng>, queue: &mut FrameQueue, w: f64, h: f64) -> bool {
        rl.start(Bounds::new(w, h), Theme::Dark, Palette::dark(), queue)
    }

    #[test]
    fn test_starts_stopped_with_no_orbs() {
        let rl = seeded();
        assert_eq!(rl.state(), LoopState::Stopped);
        assert!(rl.orbs().is_empty());
        assert_eq!(rl.grid_offset(), None);
    }

    #[test]
    fn test_start_and_stop() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        assert!(start_dark(&mut rl, &mut queue, 800.0, 600.0));
        assert_eq!(rl.state(), LoopState::Running);
        assert_eq!(rl.orbs().len(), ORB_COUNT);
        assert_eq!(rl.grid_offset(), Some(0.0));
        assert_eq!(queue.pending(), 1);

        let token = rl.cancel_token().unwrap();
        rl.stop(&mut queue);
        assert_eq!(rl.state(), LoopState::Stopped);
        assert!(rl.orbs().is_empty());
        assert!(token.is_cancelled());
        // The pending continuation was cancelled
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_first_tick_scenario() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        start_dark(&mut rl, &mut queue, 800.0, 600.0);
        let before: Vec<Orb> = rl.orbs().to_vec();

        let mut canvas = Recorder::new(800.0, 600.0);
        let handle = queue.next_due().unwrap();
        let stats = rl.on_frame(handle, &mut canvas, &mut queue).unwrap();

        assert_eq!(stats.vertical_lines, 17);
        assert_eq!(stats.horizontal_lines, 13);
        assert_eq!(stats.orbs, 5);
        assert_eq!(rl.grid_offset(), Some(0.5));

        // Wash first, with the dark color
        match &canvas.ops[0] {
            Op::Fill(c) => {
                assert_eq!(c.opaque(), crate::types::Rgb { r: 10, g: 10, b: 15 });
                assert!((c.a - 0.3).abs() < 1e-6);
            }
            other => panic!("expected wash, got {:?}", other),
        }
        // Then all vertical lines, all horizontal lines, then orbs
        assert_eq!(canvas.ops[1], Op::Vertical(-49.5));
        assert_eq!(canvas.ops[17], Op::Vertical(750.5));
        assert_eq!(canvas.ops[18], Op::Horizontal(-49.5));
        assert_eq!(canvas.ops[30], Op::Horizontal(550.5));
        assert!(canvas.ops[31..36].iter().all(|op| matches!(op, Op::Radial(..))));
        assert_eq!(canvas.ops.len(), 36);

        // Every axis that did not reflect moved by exactly its velocity
        for (old, new) in before.iter().zip(rl.orbs()) {
            if new.vx == old.vx {
                assert!((new.x - (old.x + old.vx)).abs() < 1e-9);
            }
            if new.vy == old.vy {
                assert!((new.y - (old.y + old.vy)).abs() < 1e-9);
            }
        }

        // Exactly one continuation scheduled
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_grid_offset_monotonic_and_wrapping() {
        let positions: Vec<f64> = grid_lines(49.5, 120.0).collect();
        assert_eq!(positions, vec![-0.5, 49.5, 99.5]);

        // 49.5 -> 50.0 wraps: first line on screen moves to x = 0, not 50
        let wrapped: Vec<f64> = grid_lines(50.0, 120.0).collect();
        assert_eq!(wrapped, vec![-50.0, 0.0, 50.0, 100.0]);

        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        start_dark(&mut rl, &mut queue, 200.0, 100.0);
        let mut canvas = Recorder::new(200.0, 100.0);
        let mut last = 0.0;
        for _ in 0..150 {
            let handle = queue.next_due().unwrap();
            rl.on_frame(handle, &mut canvas, &mut queue).unwrap();
            let offset = rl.grid_offset().unwrap();
            assert_eq!(offset - last, GRID_STEP);
            last = offset;
        }
        assert_eq!(rl.ticks(), 150);
    }

    #[test]
    fn test_stale_handle_is_ignored() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        start_dark(&mut rl, &mut queue, 800.0, 600.0);
        let first = queue.next_due().unwrap();

        // Restart invalidates the first handle
        rl.restart(Bounds::new(800.0, 600.0), Theme::Light, Palette::light(), &mut queue);
        let mut canvas = Recorder::new(800.0, 600.0);
        assert!(rl.on_frame(first, &mut canvas, &mut queue).is_none());
        assert!(canvas.ops.is_empty());
        assert_eq!(rl.theme(), Some(Theme::Light));
    }

    #[test]
    fn test_theme_restart_rerandomizes_orbs() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        start_dark(&mut rl, &mut queue, 800.0, 600.0);
        let dark_orbs = rl.orbs().to_vec();
        rl.restart(Bounds::new(800.0, 600.0), Theme::Light, Palette::light(), &mut queue);
        assert_eq!(rl.orbs().len(), ORB_COUNT);
        assert_ne!(rl.orbs(), dark_orbs.as_slice());
        assert_eq!(rl.grid_offset(), Some(0.0));
        // Only the new session's frame is pending
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_same_seed_same_orbs() {
        let bounds = Bounds::new(640.0, 480.0);
        let mut a = RenderLoop::new(session_rng(99));
        let mut b = RenderLoop::new(session_rng(99));
        let mut queue = FrameQueue::new();
        a.start(bounds, Theme::Dark, Palette::dark(), &mut queue);
        b.start(bounds, Theme::Dark, Palette::dark(), &mut queue);
        assert_eq!(a.orbs(), b.orbs());
    }

    #[test]
    fn test_zero_area_defers_activation() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        assert!(!start_dark(&mut rl, &mut queue, 0.0, 600.0));
        assert_eq!(rl.state(), LoopState::Stopped);
        assert!(rl.is_deferred());
        assert!(rl.orbs().is_empty());
        assert_eq!(queue.pending(), 0);

        assert!(!rl.resume_deferred(Bounds::new(0.0, 0.0), &mut queue));
        assert!(rl.resume_deferred(Bounds::new(320.0, 200.0), &mut queue));
        assert_eq!(rl.state(), LoopState::Running);
        assert_eq!(rl.orbs().len(), ORB_COUNT);
        assert!(!rl.is_deferred());
    }

    #[test]
    fn test_stop_clears_deferred_start() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        start_dark(&mut rl, &mut queue, 0.0, 0.0);
        rl.stop(&mut queue);
        assert!(!rl.resume_deferred(Bounds::new(100.0, 100.0), &mut queue));
        assert_eq!(rl.state(), LoopState::Stopped);
    }

    #[test]
    fn test_external_cancel_stops_at_next_frame() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        start_dark(&mut rl, &mut queue, 800.0, 600.0);
        rl.cancel_token().unwrap().cancel();

        let mut canvas = Recorder::new(800.0, 600.0);
        let handle = queue.next_due().unwrap();
        assert!(rl.on_frame(handle, &mut canvas, &mut queue).is_none());
        assert_eq!(rl.state(), LoopState::Stopped);
        assert_eq!(queue.pending(), 0);
        assert!(canvas.ops.is_empty());
    }

    #[test]
    fn test_trail_drawn_on_overlay_and_survives_restart() {
        // StepRng at max always accepts the spawn roll
        let mut rl = RenderLoop::new(StepRng::new(u64::MAX, 0));
        rl.set_show_cursor(false);
        let mut queue = FrameQueue::new();
        rl.start(Bounds::new(100.0, 100.0), Theme::Dark, Palette::dark(), &mut queue);
        for i in 0..25 {
            rl.pointer_moved(10.0 + i as f64, 20.0);
        }
        assert_eq!(rl.trail().len(), 20);

        let mut canvas = Recorder::new(100.0, 100.0);
        let handle = queue.next_due().unwrap();
        let stats = rl.on_frame(handle, &mut canvas, &mut queue).unwrap();
        assert_eq!(stats.particles, 20);
        assert!(!canvas.ops.iter().any(|op| matches!(op, Op::Square(..))));

        let mut overlay = Recorder::new(100.0, 100.0);
        assert_eq!(rl.draw_overlay(&mut overlay), 20);
        assert_eq!(overlay.ops.len(), 20);
        // Opacity follows life after one tick of decay
        if let Op::Square(_, _, alpha) = overlay.ops[0] {
            assert!((alpha - 0.98).abs() < 1e-4);
        } else {
            panic!("expected a particle marker, got {:?}", overlay.ops[0]);
        }

        rl.restart(Bounds::new(100.0, 100.0), Theme::Light, Palette::light(), &mut queue);
        assert_eq!(rl.trail().len(), 20);
    }

    #[test]
    fn test_cursor_ring_follows_pointer() {
        let mut rl = RenderLoop::new(StepRng::new(0, 0));
        let mut queue = FrameQueue::new();
        rl.start(Bounds::new(100.0, 100.0), Theme::Dark, Palette::dark(), &mut queue);

        let mut overlay = Recorder::new(100.0, 100.0);
        rl.draw_overlay(&mut overlay);
        assert!(overlay.ops.is_empty());

        rl.pointer_moved(40.0, 60.0);
        assert_eq!(rl.pointer(), Pointer { x: 40.0, y: 60.0, seen: true });
        let mut scene = Recorder::new(100.0, 100.0);
        rl.tick(&mut scene);
        assert!(!scene.ops.iter().any(|op| matches!(op, Op::Ring(..))));
        rl.draw_overlay(&mut overlay);
        assert_eq!(overlay.ops, vec![Op::Ring(40.0, 60.0)]);
    }

    #[test]
    fn test_overlay_never_enters_the_scene() {
        // Same generator on both sides, so both sessions get the same orbs
        let mut with_pointer = RenderLoop::new(StepRng::new(u64::MAX, 0));
        let mut without = RenderLoop::new(StepRng::new(u64::MAX, 0));
        let mut queue_a = FrameQueue::new();
        let mut queue_b = FrameQueue::new();
        let mut scene_a = Surface::new();
        let mut scene_b = Surface::new();
        scene_a.initialize(100, 100);
        scene_b.initialize(100, 100);
        with_pointer.start(scene_a.bounds(), Theme::Dark, Palette::dark(), &mut queue_a);
        without.start(scene_b.bounds(), Theme::Dark, Palette::dark(), &mut queue_b);
        assert_eq!(with_pointer.orbs(), without.orbs());

        with_pointer.pointer_moved(50.0, 50.0);
        assert_eq!(with_pointer.trail().len(), 1);

        let backdrop = Palette::dark().backdrop;
        let mut frame = Surface::new();
        for _ in 0..3 {
            let handle = queue_a.next_due().unwrap();
            with_pointer.on_frame(handle, &mut scene_a, &mut queue_a).unwrap();
            let handle = queue_b.next_due().unwrap();
            without.on_frame(handle, &mut scene_b, &mut queue_b).unwrap();

            frame.clone_from(&scene_a);
            assert_eq!(with_pointer.draw_overlay(&mut frame), 1);
            assert_ne!(frame.to_rgb8(backdrop), scene_a.to_rgb8(backdrop));
            assert_eq!(scene_a.to_rgb8(backdrop), scene_b.to_rgb8(backdrop));
        }

        // Once the trail is cleared, the next frame carries no trace of it
        with_pointer.trail_mut().clear();
        with_pointer.set_show_cursor(false);
        let handle = queue_a.next_due().unwrap();
        with_pointer.on_frame(handle, &mut scene_a, &mut queue_a).unwrap();
        frame.clone_from(&scene_a);
        assert_eq!(with_pointer.draw_overlay(&mut frame), 0);
        assert_eq!(frame.to_rgb8(backdrop), scene_a.to_rgb8(backdrop));
    }

    #[test]
    fn test_zero_area_surface_freezes_orbs() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        let mut surface = Surface::new();
        surface.initialize(800, 600);
        rl.start(surface.bounds(), Theme::Dark, Palette::dark(), &mut queue);
        let handle = queue.next_due().unwrap();
        rl.on_frame(handle, &mut surface, &mut queue).unwrap();
        let parked = rl.orbs().to_vec();
        let offset = rl.grid_offset();

        surface.resize(0, 0);
        for _ in 0..4000 {
            let handle = queue.next_due().unwrap();
            assert_eq!(rl.on_frame(handle, &mut surface, &mut queue), Some(FrameStats::default()));
        }
        assert_eq!(rl.state(), LoopState::Running);
        assert_eq!(queue.pending(), 1);

        surface.resize(800, 600);
        assert_eq!(rl.orbs(), parked.as_slice());
        assert_eq!(rl.grid_offset(), offset);
        assert_eq!(rl.ticks(), 1);
    }

    #[test]
    fn test_resize_mid_run_uses_new_bounds() {
        let mut rl = seeded();
        let mut queue = FrameQueue::new();
        let mut surface = Surface::new();
        surface.initialize(800, 600);
        rl.start(surface.bounds(), Theme::Dark, Palette::dark(), &mut queue);
        for _ in 0..10 {
            let handle = queue.next_due().unwrap();
            rl.on_frame(handle, &mut surface, &mut queue).unwrap();
        }

        surface.resize(400, 300);
        let outside: Vec<bool> = rl.orbs().iter().map(|o| o.x > 400.0).collect();
        let handle = queue.next_due().unwrap();
        let stats = rl.on_frame(handle, &mut surface, &mut queue).unwrap();
        assert_eq!(stats.vertical_lines, 9);
        assert_eq!(stats.horizontal_lines, 7);
        for (orb, was_outside) in rl.orbs().iter().zip(outside) {
            if was_outside {
                assert!(orb.vx < 0.0, "orb beyond the new width must head back");
            }
        }
    }

    #[test]
    fn test_tick_while_stopped_draws_nothing() {
        let mut rl = seeded();
        let mut canvas = Recorder::new(10.0, 10.0);
        assert_eq!(rl.tick(&mut canvas), FrameStats::default());
        assert!(canvas.ops.is_empty());
    }
}

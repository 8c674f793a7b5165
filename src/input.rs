// Input Module - Forwards pointer and viewport events into the render loop
use rand::Rng;
use tracing::debug;

use crate::renderer::RenderLoop;
use crate::scheduler::FrameScheduler;
use crate::surface::{Canvas, Surface};

/// Stateless forwarder between host events and the animation state.
/// Events arriving while detached are dropped, so a torn-down host cannot
/// keep feeding a stopped loop.
#[derive(Debug, Default)]
pub struct InputBridge {
    attached: bool,
}

impl InputBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Update the shared pointer, then roll for a trail particle
    pub fn on_pointer_move<R: Rng>(&self, render_loop: &mut RenderLoop<R>, x: f64, y: f64) -> Option<u64> {
        if !self.attached {
            return None;
        }
        render_loop.pointer_moved(x, y)
    }

    /// Re-adopt the viewport size. A start deferred for lack of area is
    /// activated once the new size is drawable.
    pub fn on_viewport_resize<R, S>(
        &self,
        surface: &mut Surface,
        render_loop: &mut RenderLoop<R>,
        scheduler: &mut S,
        width: u32,
        height: u32,
    ) where
        R: Rng,
        S: FrameScheduler + ?Sized,
    {
        if !self.attached {
            return;
        }
        debug!(width, height, "viewport resized");
        surface.resize(width, height);
        render_loop.resume_deferred(surface.bounds(), scheduler);
    }
}

// Scheduler Module - Schedule-once, cancelable display refresh callbacks
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Identifies one requested frame. Handles are never reused by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// The host's display refresh primitive. A request fires at most once;
/// cancelling a handle that already fired is a no-op.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Real-time pacing at a target FPS, polled by the host event loop
pub struct FramePacer {
    frame_duration: Duration,
    pending: Option<(FrameHandle, Instant)>,
    last_fired: Option<Instant>,
    next_id: u64,
}

impl FramePacer {
    pub fn new(fps: f64) -> Self {
        FramePacer {
            frame_duration: Self::duration_for(fps),
            pending: None,
            last_fired: None,
            next_id: 0,
        }
    }

    fn duration_for(fps: f64) -> Duration {
        Duration::from_secs_f64(1.0 / fps.clamp(1.0, 240.0))
    }

    pub fn set_fps(&mut self, fps: f64) {
        self.frame_duration = Self::duration_for(fps);
        if let (Some((handle, _)), Some(last)) = (self.pending, self.last_fired) {
            self.pending = Some((handle, last + self.frame_duration));
        }
    }

    /// Take the pending frame if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<FrameHandle> {
        match self.pending {
            Some((handle, deadline)) if deadline <= now => {
                self.pending = None;
                self.last_fired = Some(now);
                Some(handle)
            }
            _ => None,
        }
    }

    /// How long the host may block on input before the next frame is due.
    /// None when nothing is pending.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, deadline)| deadline.saturating_duration_since(now))
    }

    fn request_at(&mut self, now: Instant) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        let deadline = match self.last_fired {
            Some(last) => (last + self.frame_duration).max(now),
            None => now,
        };
        self.pending = Some((handle, deadline));
        handle
    }
}

impl FrameScheduler for FramePacer {
    fn request_frame(&mut self) -> FrameHandle {
        self.request_at(Instant::now())
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if matches!(self.pending, Some((pending, _)) if pending == handle) {
            self.pending = None;
        }
    }
}

/// Fires requests immediately in FIFO order. Drives headless rendering.
#[derive(Default)]
pub struct FrameQueue {
    queue: VecDeque<FrameHandle>,
    next_id: u64,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_due(&mut self) -> Option<FrameHandle> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.queue.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.queue.retain(|h| *h != handle);
    }
}

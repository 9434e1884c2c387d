//! Cooperative frame loop driven by the host's redraw callback
//!
//! There is no thread and no timer. The host calls [`RenderLoop::tick`] from
//! its frame callback; the tick runs the frame body and asks the host for the
//! next frame through a [`FrameRequester`]. Cancelling the [`LoopHandle`] stops
//! the chain at the next tick.

use std::cell::Cell;
use std::rc::Rc;

/// The host's "call me again next frame" facility
pub trait FrameRequester {
    fn request_frame(&self);
}

impl<F: Fn()> FrameRequester for F {
    fn request_frame(&self) {
        self()
    }
}

/// Cancellation handle of a running loop.
///
/// Clones share the same flag. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    canceled: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        if !self.canceled.replace(true) {
            log::debug!("render loop canceled");
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.get()
    }
}

/// A started loop: its handle plus the requester used to schedule frames
pub struct RenderLoop {
    handle: LoopHandle,
    requester: Rc<dyn FrameRequester>,
    frames: u64,
}

impl RenderLoop {
    /// Start a loop and request its first frame
    pub fn start(requester: Rc<dyn FrameRequester>) -> Self {
        let render_loop = Self {
            handle: LoopHandle::default(),
            requester,
            frames: 0,
        };
        render_loop.requester.request_frame();
        render_loop
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_canceled()
    }

    /// Frames drawn since the loop started
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run `body` for one frame and schedule the next.
    ///
    /// Returns `false` without calling `body` once the loop is canceled. A
    /// body that cancels the loop also suppresses the next request.
    pub fn tick<F>(&mut self, body: F) -> bool
    where
        F: FnOnce(),
    {
        if self.handle.is_canceled() {
            return false;
        }
        body();
        self.frames += 1;
        if !self.handle.is_canceled() {
            self.requester.request_frame();
        }
        true
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_requester() -> (Rc<Cell<u32>>, Rc<dyn FrameRequester>) {
        let requests = Rc::new(Cell::new(0));
        let counter = requests.clone();
        let requester: Rc<dyn FrameRequester> = Rc::new(move || counter.set(counter.get() + 1));
        (requests, requester)
    }

    #[test]
    fn test_start_requests_first_frame() {
        let (requests, requester) = counting_requester();
        let render_loop = RenderLoop::start(requester);
        assert_eq!(requests.get(), 1);
        assert!(render_loop.is_running());
    }

    #[test]
    fn test_tick_runs_body_and_requests_next() {
        let (requests, requester) = counting_requester();
        let mut render_loop = RenderLoop::start(requester);
        let mut ran = 0;
        assert!(render_loop.tick(|| ran += 1));
        assert!(render_loop.tick(|| ran += 1));
        assert_eq!(ran, 2);
        assert_eq!(render_loop.frames(), 2);
        assert_eq!(requests.get(), 3);
    }

    #[test]
    fn test_canceled_tick_does_nothing() {
        let (requests, requester) = counting_requester();
        let mut render_loop = RenderLoop::start(requester);
        let handle = render_loop.handle();
        handle.cancel();
        handle.cancel();

        let mut ran = false;
        assert!(!render_loop.tick(|| ran = true));
        assert!(!ran);
        assert_eq!(requests.get(), 1);
        assert!(!render_loop.is_running());
    }

    #[test]
    fn test_cancel_inside_body_stops_requests() {
        let (requests, requester) = counting_requester();
        let mut render_loop = RenderLoop::start(requester);
        let handle = render_loop.handle();
        assert!(render_loop.tick(|| handle.cancel()));
        assert_eq!(requests.get(), 1);
        assert!(!render_loop.tick(|| {}));
    }

    #[test]
    fn test_drop_cancels_handle() {
        let (_, requester) = counting_requester();
        let render_loop = RenderLoop::start(requester);
        let handle = render_loop.handle();
        drop(render_loop);
        assert!(handle.is_canceled());
    }
}

//! Edge auto-scroll while a gesture is active.
//!
//! # Algorithm
//!
//! For each axis, if the pointer is within `margin` px of an edge of the
//! visible region, scroll toward that edge by
//!
//! ```text
//! speed = max_speed × (margin − distance) / margin     (clamped to [0, max_speed])
//! ```
//!
//! pixels per frame. A pointer at or beyond the edge scrolls at full speed.
//! When both edges are within the margin (tiny viewports), the nearer wins.
//!
//! # Ticking
//!
//! [`AutoScrollTask`] runs on a fixed frame interval and reads the last
//! recorded pointer position, so scrolling continues while the pointer is
//! held still at an edge. It is started when a drag activates and aborted
//! when the gesture ends or the task is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::BoardConfig;
use crate::gesture::PointerPosition;

/// Visible region of the scroll container, in board content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Something that can be scrolled.
pub trait ScrollTarget: Send + Sync {
    /// Current visible region.
    fn viewport(&self) -> Viewport;
    /// Scrolls by the given offsets (px).
    fn scroll_by(&self, dx: f64, dy: f64);
}

/// Edge-proximity speed computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScroll {
    /// Distance from an edge where scrolling starts (px).
    pub margin_px: f64,
    /// Speed at the edge (px per frame).
    pub max_speed_px: f64,
}

impl AutoScroll {
    pub fn new(margin_px: f64, max_speed_px: f64) -> Self {
        Self {
            margin_px,
            max_speed_px,
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(config.auto_scroll_margin_px, config.auto_scroll_max_speed_px)
    }

    /// Signed speed along one axis for a pointer at `pos` within `[lo, hi]`.
    pub fn axis_speed(&self, pos: f64, lo: f64, hi: f64) -> f64 {
        if self.margin_px <= 0.0 || hi <= lo {
            return 0.0;
        }
        let to_lo = pos - lo;
        let to_hi = hi - pos;
        if to_lo <= to_hi && to_lo < self.margin_px {
            -self.speed_at(to_lo)
        } else if to_hi < self.margin_px {
            self.speed_at(to_hi)
        } else {
            0.0
        }
    }

    fn speed_at(&self, distance: f64) -> f64 {
        let depth = ((self.margin_px - distance) / self.margin_px).clamp(0.0, 1.0);
        self.max_speed_px * depth
    }

    /// Per-frame scroll `(dx, dy)` for `pointer` inside `viewport`.
    pub fn velocity(&self, pointer: PointerPosition, viewport: &Viewport) -> (f64, f64) {
        (
            self.axis_speed(pointer.x, viewport.left, viewport.left + viewport.width),
            self.axis_speed(pointer.y, viewport.top, viewport.top + viewport.height),
        )
    }
}

/// Frame-driven auto-scroll loop tied to one gesture.
pub struct AutoScrollTask {
    target: Arc<dyn ScrollTarget>,
    pointer: watch::Sender<PointerPosition>,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for AutoScrollTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoScrollTask")
            .field("pointer", &*self.pointer.borrow())
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

fn relative(pos: PointerPosition, viewport: &Viewport) -> PointerPosition {
    PointerPosition::new(pos.x - viewport.left, pos.y - viewport.top)
}

impl AutoScrollTask {
    /// Spawns the loop on `runtime`.
    ///
    /// # Arguments
    /// * `scroll` - Speed parameters.
    /// * `frame` - Tick interval.
    /// * `target` - Container to scroll.
    /// * `pointer` - Pointer position in content coordinates.
    pub fn spawn(
        runtime: &Handle,
        scroll: AutoScroll,
        frame: Duration,
        target: Arc<dyn ScrollTarget>,
        pointer: PointerPosition,
    ) -> Self {
        // The pointer is stored relative to the viewport so a stationary
        // pointer stays at the edge while the content moves under it.
        let (tx, mut rx) = watch::channel(relative(pointer, &target.viewport()));
        let frame = frame.max(Duration::from_millis(1));
        let loop_target = Arc::clone(&target);

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(frame);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if rx.has_changed().is_err() {
                    break;
                }
                let rel = *rx.borrow_and_update();
                let viewport = loop_target.viewport();
                let pos = PointerPosition::new(viewport.left + rel.x, viewport.top + rel.y);
                let (dx, dy) = scroll.velocity(pos, &viewport);
                if dx != 0.0 || dy != 0.0 {
                    loop_target.scroll_by(dx, dy);
                }
            }
        });

        Self {
            target,
            pointer: tx,
            handle,
        }
    }

    /// Records a new pointer position (content coordinates).
    pub fn update_pointer(&self, pointer: PointerPosition) {
        self.pointer
            .send_replace(relative(pointer, &self.target.viewport()));
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the loop.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutoScrollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingScroller;

    fn scroll() -> AutoScroll {
        AutoScroll::new(160.0, 40.0)
    }

    #[test]
    fn test_no_scroll_in_centre() {
        let vp = Viewport::new(0.0, 0.0, 1000.0, 800.0);
        assert_eq!(scroll().velocity(PointerPosition::new(500.0, 400.0), &vp), (0.0, 0.0));
    }

    #[test]
    fn test_linear_in_margin_depth() {
        let s = scroll();
        // Halfway into the right margin
        assert!((s.axis_speed(920.0, 0.0, 1000.0) - 20.0).abs() < 1e-9);
        // Quarter into the left margin
        assert!((s.axis_speed(120.0, 0.0, 1000.0) + 10.0).abs() < 1e-9);
        // At the edge of the margin
        assert!((s.axis_speed(840.0, 0.0, 1000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_capped_beyond_edge() {
        let s = scroll();
        assert!((s.axis_speed(1200.0, 0.0, 1000.0) - 40.0).abs() < 1e-9);
        assert!((s.axis_speed(-300.0, 0.0, 1000.0) + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_both_axes() {
        let vp = Viewport::new(100.0, 50.0, 1000.0, 800.0);
        let (dx, dy) = scroll().velocity(PointerPosition::new(1100.0, 50.0), &vp);
        assert!((dx - 40.0).abs() < 1e-9);
        assert!((dy + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(AutoScroll::new(0.0, 40.0).axis_speed(0.0, 0.0, 100.0), 0.0);
        assert_eq!(scroll().axis_speed(0.0, 100.0, 100.0), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_scrolls_while_pointer_still() {
        let target = RecordingScroller::new(Viewport::new(0.0, 0.0, 1000.0, 800.0));
        let task = AutoScrollTask::spawn(
            &Handle::current(),
            scroll(),
            Duration::from_millis(16),
            target.clone(),
            PointerPosition::new(990.0, 400.0),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let count = target.scroll_count();
        assert!(count > 1, "expected repeated scrolling, got {count}");
        assert!(target.viewport().left > 0.0);
        assert!(target.scrolls().iter().all(|&(dx, dy)| dx > 0.0 && dy == 0.0));

        task.stop();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(target.scroll_count(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_idle_when_pointer_moves_away() {
        let target = RecordingScroller::new(Viewport::new(0.0, 0.0, 1000.0, 800.0));
        let task = AutoScrollTask::spawn(
            &Handle::current(),
            scroll(),
            Duration::from_millis(16),
            target.clone(),
            PointerPosition::new(500.0, 400.0),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(target.scroll_count(), 0);

        task.update_pointer(PointerPosition::new(500.0, 5.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(target.scroll_count() > 0);
        assert!(target.viewport().top < 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts() {
        let target = RecordingScroller::new(Viewport::new(0.0, 0.0, 1000.0, 800.0));
        {
            let _task = AutoScrollTask::spawn(
                &Handle::current(),
                scroll(),
                Duration::from_millis(16),
                target.clone(),
                PointerPosition::new(0.0, 400.0),
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let count = target.scroll_count();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(target.scroll_count(), count);
    }
}

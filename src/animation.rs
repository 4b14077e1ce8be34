//! Looping animation tracks for the animated overlays.
//!
//! The host owns an [`Animator`] and advances its clock (for instance once
//! per rendered frame). Overlays register looping tracks with
//! [`Animator::start`] and keep the returned [`LoopHandle`]; reading a handle
//! samples the track at the animator's current time. Dropping a handle stops
//! its loop, so tearing down an overlay's scene releases every loop it
//! started.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

// ============================================================================
// Segments and loops
// ============================================================================

/// Interpolation curve applied within a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    /// Slow start and end.
    #[default]
    EaseInOut,
}

impl Easing {
    /// Maps linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// A single timed move from one value to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: f32,
    pub to: f32,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Segment {
    pub fn new(from: f32, to: f32, duration_ms: f64) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            easing: Easing::default(),
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    fn sample(&self, elapsed_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return self.to;
        }
        let t = self.easing.apply((elapsed_ms / self.duration_ms) as f32);
        self.from + (self.to - self.from) * t
    }
}

/// A sequence of segments that repeats forever after an initial delay.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    segments: Vec<Segment>,
    delay_ms: f64,
}

impl LoopSpec {
    /// Loops a single segment.
    pub fn timing(segment: Segment) -> Self {
        Self::sequence(vec![segment])
    }

    /// Loops the segments in order.
    pub fn sequence(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            delay_ms: 0.0,
        }
    }

    /// Holds the first segment's start value for `delay_ms` before starting.
    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms.max(0.0);
        self
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    /// Length of one iteration.
    pub fn period_ms(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }

    /// Value `elapsed_ms` after the loop was started.
    pub fn value_at(&self, elapsed_ms: f64) -> f32 {
        let Some(first) = self.segments.first() else {
            return 0.0;
        };
        if elapsed_ms < self.delay_ms {
            return first.from;
        }

        let period = self.period_ms();
        if period <= 0.0 {
            return self.segments.last().map_or(first.to, |s| s.to);
        }

        let mut t = (elapsed_ms - self.delay_ms) % period;
        for segment in &self.segments {
            if t < segment.duration_ms {
                return segment.sample(t);
            }
            t -= segment.duration_ms;
        }
        self.segments.last().map_or(first.to, |s| s.to)
    }
}

// ============================================================================
// Animator
// ============================================================================

struct Running {
    spec: LoopSpec,
    started_at: f64,
}

#[derive(Default)]
struct Clock {
    now_ms: f64,
    next_id: u64,
    loops: HashMap<u64, Running>,
}

fn lock(clock: &Mutex<Clock>) -> MutexGuard<'_, Clock> {
    clock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared clock and registry of running loops.
///
/// Cloning an `Animator` yields another handle to the same clock.
#[derive(Clone, Default)]
pub struct Animator {
    clock: Arc<Mutex<Clock>>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        lock(&self.clock).now_ms
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta_ms: f64) {
        let mut clock = lock(&self.clock);
        clock.now_ms += delta_ms.max(0.0);
    }

    /// Jumps the clock to an absolute time.
    pub fn set_time(&self, now_ms: f64) {
        lock(&self.clock).now_ms = now_ms;
    }

    /// Starts a loop at the current clock time.
    pub fn start(&self, spec: LoopSpec) -> LoopHandle {
        let mut clock = lock(&self.clock);
        let id = clock.next_id;
        clock.next_id += 1;
        let started_at = clock.now_ms;
        clock.loops.insert(id, Running { spec, started_at });

        LoopHandle {
            id,
            clock: Arc::downgrade(&self.clock),
        }
    }

    /// Number of loops currently registered.
    pub fn active_loops(&self) -> usize {
        lock(&self.clock).loops.len()
    }
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = lock(&self.clock);
        f.debug_struct("Animator")
            .field("now_ms", &clock.now_ms)
            .field("active_loops", &clock.loops.len())
            .finish()
    }
}

/// Ownership of one running loop. Dropping it stops the loop.
pub struct LoopHandle {
    id: u64,
    clock: Weak<Mutex<Clock>>,
}

impl LoopHandle {
    /// Samples the loop at the animator's current time.
    ///
    /// Returns `None` once the animator itself is gone.
    pub fn value(&self) -> Option<f32> {
        let clock = self.clock.upgrade()?;
        let clock = lock(&clock);
        let running = clock.loops.get(&self.id)?;
        Some(running.spec.value_at(clock.now_ms - running.started_at))
    }

    pub fn is_running(&self) -> bool {
        self.clock
            .upgrade()
            .is_some_and(|clock| lock(&clock).loops.contains_key(&self.id))
    }

    /// Stops the loop now.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        if let Some(clock) = self.clock.upgrade() {
            lock(&clock).loops.remove(&self.id);
        }
    }
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn linear_segment_interpolates() {
        let spec = LoopSpec::timing(Segment::new(-20.0, 120.0, 1000.0).with_easing(Easing::Linear));
        assert!(approx(spec.value_at(0.0), -20.0));
        assert!(approx(spec.value_at(500.0), 50.0));
        // Wraps back to the start each period.
        assert!(approx(spec.value_at(1250.0), 15.0));
    }

    #[test]
    fn sequence_walks_segments() {
        let spec = LoopSpec::sequence(vec![
            Segment::new(0.0, 1.0, 500.0),
            Segment::new(1.0, 0.3, 500.0),
        ]);
        assert_eq!(spec.period_ms(), 1000.0);
        assert!(approx(spec.value_at(0.0), 0.0));
        assert!(approx(spec.value_at(499.999), 1.0));
        assert!(approx(spec.value_at(750.0), 0.65));
        assert!(approx(spec.value_at(1000.0), 0.0));
    }

    #[test]
    fn delay_holds_initial_value() {
        let spec = LoopSpec::timing(Segment::new(0.0, 1.0, 100.0).with_easing(Easing::Linear))
            .with_delay(300.0);
        assert!(approx(spec.value_at(0.0), 0.0));
        assert!(approx(spec.value_at(299.0), 0.0));
        assert!(approx(spec.value_at(350.0), 0.5));
    }

    #[test]
    fn ease_in_out_is_symmetric() {
        assert!(approx(Easing::EaseInOut.apply(0.5), 0.5));
        assert!(Easing::EaseInOut.apply(0.1) < 0.1);
        assert!(Easing::EaseInOut.apply(0.9) > 0.9);
    }

    #[test]
    fn handle_samples_animator_time() {
        let animator = Animator::new();
        animator.set_time(1_000.0);
        let handle = animator.start(LoopSpec::timing(
            Segment::new(0.0, 10.0, 100.0).with_easing(Easing::Linear),
        ));

        assert!(approx(handle.value().unwrap(), 0.0));
        animator.advance(50.0);
        assert!(approx(handle.value().unwrap(), 5.0));
    }

    #[test]
    fn dropping_handles_stops_loops() {
        let animator = Animator::new();
        let a = animator.start(LoopSpec::timing(Segment::new(0.0, 1.0, 10.0)));
        let b = animator.start(LoopSpec::timing(Segment::new(0.0, 1.0, 10.0)));
        assert_eq!(animator.active_loops(), 2);

        a.stop();
        assert_eq!(animator.active_loops(), 1);
        assert!(b.is_running());

        drop(b);
        assert_eq!(animator.active_loops(), 0);
    }

    #[test]
    fn handle_outliving_animator_reads_none() {
        let animator = Animator::new();
        let handle = animator.start(LoopSpec::timing(Segment::new(0.0, 1.0, 10.0)));
        drop(animator);
        assert!(handle.value().is_none());
        assert!(!handle.is_running());
    }
}

//! Frame scheduling with an injectable clock.
//!
//! The host owns the actual frame callback (requestAnimationFrame, a tokio
//! interval, a test loop). [`Scheduler`] only tracks whether a frame request
//! is outstanding and converts wall time into a bounded number of fixed
//! simulation steps.

use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Fixed-timestep accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStep {
    step: Duration,
    max_steps: u32,
    accumulator: Duration,
}

// Period for `rate_hz`, or `None` if it is not a usable positive duration.
fn period(rate_hz: f32) -> Option<Duration> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return None;
    }
    Duration::try_from_secs_f32(1.0 / rate_hz)
        .ok()
        .filter(|d| !d.is_zero())
}

impl FixedStep {
    pub fn new(rate_hz: f32, max_steps: u32) -> Self {
        let step = period(rate_hz).unwrap_or_else(|| {
            warn!("unusable tick rate {}; using 30 Hz", rate_hz);
            Duration::from_secs_f32(1.0 / 30.0)
        });
        Self {
            step,
            max_steps: max_steps.max(1),
            accumulator: Duration::ZERO,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Unusable rates leave the current step unchanged.
    pub fn set_rate(&mut self, rate_hz: f32) {
        match period(rate_hz) {
            Some(step) => self.step = step,
            None => warn!("ignoring tick rate {}", rate_hz),
        }
    }

    /// Add `dt` and return how many whole steps are due.
    ///
    /// At most `max_steps` are returned; any backlog beyond that is dropped so
    /// a long stall does not trigger a burst of catch-up work.
    pub fn accumulate(&mut self, dt: Duration) -> u32 {
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            self.accumulator = Duration::ZERO;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Inactive,
    Active,
}

/// What the host should do for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub dt: Duration,
    pub sim_steps: u32,
}

pub struct Scheduler<C: Clock> {
    clock: C,
    state: LoopState,
    // Outstanding host frame request; `stop` cancels it exactly once.
    pending: bool,
    last_frame: Option<Duration>,
    fixed: FixedStep,
    frames: u64,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, rate_hz: f32, max_steps_per_frame: u32) -> Self {
        Self {
            clock,
            state: LoopState::Inactive,
            pending: false,
            last_frame: None,
            fixed: FixedStep::new(rate_hz, max_steps_per_frame),
            frames: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LoopState::Active
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn set_rate(&mut self, rate_hz: f32) {
        self.fixed.set_rate(rate_hz);
    }

    /// Returns true if the loop transitioned to active.
    pub fn start(&mut self) -> bool {
        if self.state == LoopState::Active {
            return false;
        }
        self.state = LoopState::Active;
        self.pending = true;
        self.last_frame = None;
        self.fixed.reset();
        info!("render loop started");
        true
    }

    /// Returns true if a pending frame request was cancelled.
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Inactive {
            return false;
        }
        self.state = LoopState::Inactive;
        let cancelled = std::mem::take(&mut self.pending);
        info!("render loop stopped");
        cancelled
    }

    /// Called from the host's frame callback.
    ///
    /// Returns `None` when the loop is inactive; otherwise consumes the
    /// outstanding request, schedules the next one and reports how many
    /// simulation steps are due.
    pub fn on_frame(&mut self) -> Option<FrameTick> {
        if self.state != LoopState::Active || !self.pending {
            return None;
        }
        let now = self.clock.now();
        let dt = match self.last_frame {
            Some(prev) => now.saturating_sub(prev),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);
        let sim_steps = self.fixed.accumulate(dt);
        self.frames += 1;
        if sim_steps > 1 {
            debug!("frame {}: {} sim steps", self.frames, sim_steps);
        }
        // Re-arm.
        self.pending = true;
        Some(FrameTick { dt, sim_steps })
    }
}

//! Incremental scheduler: coalesces bursts of highlight requests.
//!
//! ## State Machine
//!
//! ```text
//!            request, threshold elapsed
//!   Idle ─────────────────────────────────▶ run pass now ──▶ Idle
//!    │
//!    │ request, too soon after the last pass
//!    ▼
//!  Armed ──request──▶ Armed   (producer replaced, no second timer)
//!    │
//!    │ deadline reached (fire_due)
//!    ▼
//!  run pass with the LATEST producer ──▶ Idle
//! ```
//!
//! The threshold adapts to the cost of the work: it is the duration of
//! the previous pass, floored at a minimum interval. A slow buffer is
//! therefore re-analyzed less often than a fast one.
//!
//! The scheduler performs no I/O and owns no timer. It reports deadlines
//! through [`Scheduler::next_deadline`]; whoever drives it (a test, or
//! `Workbench::run_deferred` on tokio) calls [`Scheduler::fire_due`]
//! once a deadline has passed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::session::SessionId;

/// An immutable copy of a buffer's text.
pub type TextSnapshot = Arc<str>;

/// Reads the text to analyze. Called when the pass actually runs.
pub type SnapshotProducer = Box<dyn FnOnce() -> TextSnapshot + Send>;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock, read through tokio so paused test time applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    pub fn advance(&self, by: Duration) {
        match self.0.lock() {
            Ok(mut now) => *now += by,
            Err(poisoned) => *poisoned.into_inner() += by,
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.0.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The pass ran synchronously
    Ran(T),
    /// A timer was armed; the pass runs once `delay` has elapsed
    Deferred { delay: Duration },
    /// A timer was already armed; it will use this request's producer
    Coalesced,
}

impl<T> Dispatch<T> {
    pub fn ran(&self) -> Option<&T> {
        match self {
            Dispatch::Ran(output) => Some(output),
            _ => None,
        }
    }
}

/// Per-session timing state.
#[derive(Default)]
pub struct ScheduleState {
    last_pass_start: Option<Instant>,
    last_pass_duration: Duration,
    last_pass_end: Option<Instant>,
    deadline: Option<Instant>,
    pending: Option<SnapshotProducer>,
}

impl ScheduleState {
    pub fn last_pass_start(&self) -> Option<Instant> {
        self.last_pass_start
    }

    pub fn last_pass_duration(&self) -> Duration {
        self.last_pass_duration
    }

    pub fn timer_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl std::fmt::Debug for ScheduleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleState")
            .field("last_pass_start", &self.last_pass_start)
            .field("last_pass_duration", &self.last_pass_duration)
            .field("last_pass_end", &self.last_pass_end)
            .field("deadline", &self.deadline)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

/// Throttles highlight passes per session.
#[derive(Debug)]
pub struct Scheduler<C: Clock = SystemClock> {
    clock: C,
    min_interval: Duration,
    states: HashMap<SessionId, ScheduleState>,
}

impl Scheduler<SystemClock> {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(SystemClock, min_interval)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            states: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn set_min_interval(&mut self, min_interval: Duration) {
        self.min_interval = min_interval;
    }

    pub fn state(&self, session: SessionId) -> Option<&ScheduleState> {
        self.states.get(&session)
    }

    /// Drops the state of a closed session, pending timer included.
    pub fn forget(&mut self, session: SessionId) {
        self.states.remove(&session);
    }

    /// Requests a highlight pass.
    ///
    /// `pass` runs at most once, right now, and only when the request is
    /// not throttled. A throttled request stores `producer` and is run by a
    /// later [`fire_due`](Self::fire_due).
    pub fn request<T>(
        &mut self,
        session: SessionId,
        producer: SnapshotProducer,
        pass: impl FnOnce(TextSnapshot) -> T,
    ) -> Dispatch<T> {
        let now = self.clock.now();
        let min_interval = self.min_interval;
        let state = self.states.entry(session).or_default();

        if state.deadline.is_some() {
            state.pending = Some(producer);
            tracing::trace!("Session {} request coalesced into armed timer", session);
            return Dispatch::Coalesced;
        }

        let threshold = state.last_pass_duration.max(min_interval);
        if let Some(end) = state.last_pass_end {
            let elapsed = now.saturating_duration_since(end);
            if elapsed < threshold {
                let delay = threshold - elapsed;
                state.deadline = Some(now + delay);
                state.pending = Some(producer);
                tracing::trace!("Session {} pass deferred by {:?}", session, delay);
                return Dispatch::Deferred { delay };
            }
        }

        Dispatch::Ran(run_pass(&self.clock, state, producer, pass))
    }

    /// Returns the earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.states.values().filter_map(|s| s.deadline).min()
    }

    /// Runs every pass whose deadline has passed, each with the latest
    /// producer stored for its session.
    pub fn fire_due<T>(&mut self, mut pass: impl FnMut(SessionId, TextSnapshot) -> T) -> Vec<(SessionId, T)> {
        let now = self.clock.now();
        let mut due: Vec<SessionId> = self
            .states
            .iter()
            .filter(|(_, s)| s.deadline.is_some_and(|d| d <= now))
            .map(|(id, _)| *id)
            .collect();
        due.sort();

        let mut outputs = Vec::with_capacity(due.len());
        for session in due {
            let Some(state) = self.states.get_mut(&session) else {
                continue;
            };
            state.deadline = None;
            let Some(producer) = state.pending.take() else {
                continue;
            };
            tracing::trace!("Session {} timer fired", session);
            let output = run_pass(&self.clock, state, producer, |text| pass(session, text));
            outputs.push((session, output));
        }
        outputs
    }
}

fn run_pass<C: Clock, T>(
    clock: &C,
    state: &mut ScheduleState,
    producer: SnapshotProducer,
    pass: impl FnOnce(TextSnapshot) -> T,
) -> T {
    let start = clock.now();
    let output = pass(producer());
    let end = clock.now();

    state.last_pass_start = Some(start);
    state.last_pass_duration = end.saturating_duration_since(start);
    state.last_pass_end = Some(end);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIN: Duration = Duration::from_millis(20);

    fn producer(text: &str) -> SnapshotProducer {
        let text: TextSnapshot = text.into();
        Box::new(move || text)
    }

    fn scheduler() -> Scheduler<ManualClock> {
        Scheduler::with_clock(ManualClock::new(), MIN)
    }

    #[test]
    fn test_first_request_runs() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        let outcome = scheduler.request(id, producer("a"), |t| t.to_string());
        assert_eq!(outcome, Dispatch::Ran("a".to_string()));
        assert!(scheduler.next_deadline().is_none());
    }

    #[test]
    fn test_burst_is_bounded_and_uses_latest_snapshot() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        let mut passes = Vec::new();

        for i in 0..5 {
            let outcome = scheduler.request(id, producer(&format!("v{i}")), |t| t.to_string());
            if let Dispatch::Ran(text) = outcome {
                passes.push(text);
            }
        }
        assert_eq!(passes, vec!["v0".to_string()]);
        assert!(scheduler.state(id).unwrap().timer_armed());

        scheduler.clock().advance(MIN);
        for (_, text) in scheduler.fire_due(|_, t| t.to_string()) {
            passes.push(text);
        }

        assert!(passes.len() <= 2);
        assert_eq!(passes.last().map(String::as_str), Some("v4"));
        assert!(!scheduler.state(id).unwrap().timer_armed());
    }

    #[test]
    fn test_outcomes_of_a_burst() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        scheduler.request(id, producer("a"), |_| ());

        scheduler.clock().advance(Duration::from_millis(5));
        assert_eq!(
            scheduler.request(id, producer("b"), |_| ()),
            Dispatch::Deferred {
                delay: Duration::from_millis(15)
            }
        );
        assert_eq!(scheduler.request(id, producer("c"), |_| ()), Dispatch::Coalesced);
    }

    #[test]
    fn test_not_due_before_deadline() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        scheduler.request(id, producer("a"), |_| ());
        scheduler.request(id, producer("b"), |_| ());

        scheduler.clock().advance(Duration::from_millis(19));
        assert!(scheduler.fire_due(|_, _| ()).is_empty());

        scheduler.clock().advance(Duration::from_millis(1));
        assert_eq!(scheduler.fire_due(|_, _| ()).len(), 1);
        assert!(scheduler.fire_due(|_, _| ()).is_empty());
    }

    #[test]
    fn test_request_after_threshold_runs() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        scheduler.request(id, producer("a"), |_| ());
        scheduler.clock().advance(MIN);
        assert!(scheduler.request(id, producer("b"), |_| ()).ran().is_some());
    }

    #[test]
    fn test_threshold_adapts_to_slow_passes() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        let clock = scheduler.clock().clone();
        scheduler.request(id, producer("a"), |_| clock.advance(Duration::from_millis(100)));
        assert_eq!(
            scheduler.state(id).unwrap().last_pass_duration(),
            Duration::from_millis(100)
        );

        scheduler.clock().advance(Duration::from_millis(50));
        assert_eq!(
            scheduler.request(id, producer("b"), |_| ()),
            Dispatch::Deferred {
                delay: Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut scheduler = scheduler();
        let (a, b) = (SessionId::new(), SessionId::new());
        scheduler.request(a, producer("a"), |_| ());
        assert!(scheduler.request(b, producer("b"), |_| ()).ran().is_some());
        assert!(matches!(
            scheduler.request(a, producer("a2"), |_| ()),
            Dispatch::Deferred { .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_burst_runs_at_most_two_passes(gaps in prop::collection::vec(0u64..1_000, 5..19)) {
            // every gap is under 1ms, so the whole burst fits in one threshold
            let mut scheduler = scheduler();
            let id = SessionId::new();
            let mut passes = Vec::new();

            for (i, gap) in gaps.iter().enumerate() {
                scheduler.clock().advance(Duration::from_micros(*gap));
                if let Dispatch::Ran(text) = scheduler.request(id, producer(&format!("v{i}")), |t| t.to_string()) {
                    passes.push(text);
                }
                passes.extend(scheduler.fire_due(|_, t| t.to_string()).into_iter().map(|(_, t)| t));
            }
            scheduler.clock().advance(MIN);
            passes.extend(scheduler.fire_due(|_, t| t.to_string()).into_iter().map(|(_, t)| t));

            let last = format!("v{}", gaps.len() - 1);
            prop_assert!(passes.len() <= 2);
            prop_assert_eq!(passes.last(), Some(&last));
        }
    }

    #[test]
    fn test_forget_drops_pending_timer() {
        let mut scheduler = scheduler();
        let id = SessionId::new();
        scheduler.request(id, producer("a"), |_| ());
        scheduler.request(id, producer("b"), |_| ());
        scheduler.forget(id);
        assert!(scheduler.next_deadline().is_none());
    }
}

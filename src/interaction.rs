//! Hover / click / pause interaction.
//!
//! [`reduce`] is the whole state machine: a pure function from
//! `(state, event, now)` to the next state plus the effects to carry out.
//! [`HoverPauseController`] owns the current state and the single pause
//! timer handle, and applies those effects.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a click freezes rotation on the hovered song.
pub const PAUSE_DURATION: Duration = Duration::from_millis(3000);

/// Wall-clock instant in milliseconds, relative to any fixed origin the host
/// picks (typically scene mount).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub fn after(self, d: Duration) -> Self {
        let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(ms))
    }
}

/// Interaction state. Indices refer into the current filtered view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    Hovering { index: usize },
    Paused { index: usize, deadline: Timestamp },
}

impl InteractionState {
    pub fn hovered(&self) -> Option<usize> {
        match *self {
            Self::Idle => None,
            Self::Hovering { index } | Self::Paused { index, .. } => Some(index),
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// This frame's hit-test result.
    Hit(Option<usize>),
    Click,
    /// The pause deadline has passed.
    TimerElapsed,
}

/// Upward notifications for the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Notification {
    /// The hovered song changed; `None` clears the display.
    Hover(Option<usize>),
}

/// Effects on the pause timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    Cancel,
    Schedule(Timestamp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: InteractionState,
    pub notifications: Vec<Notification>,
    pub timer_ops: Vec<TimerOp>,
}

impl Transition {
    fn stay(state: InteractionState) -> Self {
        Self {
            state,
            notifications: Vec::new(),
            timer_ops: Vec::new(),
        }
    }

    fn to(state: InteractionState) -> Self {
        Self::stay(state)
    }

    fn notify(mut self, n: Notification) -> Self {
        self.notifications.push(n);
        self
    }

    fn timer(mut self, op: TimerOp) -> Self {
        self.timer_ops.push(op);
        self
    }

    fn then(mut self, next: Transition) -> Self {
        self.state = next.state;
        self.notifications.extend(next.notifications);
        self.timer_ops.extend(next.timer_ops);
        self
    }
}

/// One state transition.
pub fn reduce(
    state: InteractionState,
    event: Event,
    now: Timestamp,
    pause: Duration,
) -> Transition {
    use InteractionState::{Hovering, Idle, Paused};

    match (state, event) {
        (Idle, Event::Hit(Some(i))) => {
            Transition::to(Hovering { index: i }).notify(Notification::Hover(Some(i)))
        }
        (Idle, Event::Hit(None) | Event::Click) => Transition::stay(Idle),

        (Hovering { index }, Event::Hit(Some(j))) if j != index => {
            Transition::to(Hovering { index: j }).notify(Notification::Hover(Some(j)))
        }
        (Hovering { .. }, Event::Hit(Some(_))) => Transition::stay(state),
        (Hovering { .. }, Event::Hit(None)) => {
            Transition::to(Idle).notify(Notification::Hover(None))
        }
        (Hovering { index }, Event::Click) => {
            let deadline = now.after(pause);
            Transition::to(Paused { index, deadline })
                .timer(TimerOp::Cancel)
                .timer(TimerOp::Schedule(deadline))
        }

        (Paused { .. }, Event::Hit(None)) => Transition::to(Idle)
            .notify(Notification::Hover(None))
            .timer(TimerOp::Cancel),
        // A different target while paused is ignored until the pause ends
        // or the pointer leaves.
        (Paused { .. }, Event::Hit(Some(_))) => Transition::stay(state),
        (Paused { index, .. }, Event::TimerElapsed) => {
            Transition::to(Hovering { index }).timer(TimerOp::Cancel)
        }
        (Paused { .. }, Event::Click) => Transition::to(Idle).timer(TimerOp::Cancel),

        (Idle | Hovering { .. }, Event::TimerElapsed) => {
            debug_assert!(false, "pause timer elapsed outside Paused ({state:?})");
            Transition::stay(state)
        }
    }
}

/// Everything the pointer did during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub now: Timestamp,
    pub hit: Option<usize>,
    pub clicks: usize,
}

/// A frame's worth of transitions: a due pause deadline first, then the
/// frame's hit, then each click.
pub fn advance_interaction(
    state: InteractionState,
    input: &FrameInput,
    pause: Duration,
) -> Transition {
    let mut events = Vec::with_capacity(2 + input.clicks);
    if let InteractionState::Paused { deadline, .. } = state {
        if input.now >= deadline {
            events.push(Event::TimerElapsed);
        }
    }
    events.push(Event::Hit(input.hit));
    events.extend(std::iter::repeat_n(Event::Click, input.clicks));

    events.into_iter().fold(Transition::stay(state), |acc, event| {
        let next = reduce(acc.state, event, input.now, pause);
        acc.then(next)
    })
}

/// Handle for the single pending pause timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseTimer {
    pub id: u64,
    pub deadline: Timestamp,
}

/// Owns the interaction state and its pause timer.
#[derive(Debug)]
pub struct HoverPauseController {
    state: InteractionState,
    timer: Option<PauseTimer>,
    next_timer_id: u64,
    pause: Duration,
}

impl Default for HoverPauseController {
    fn default() -> Self {
        Self::new(PAUSE_DURATION)
    }
}

impl HoverPauseController {
    pub fn new(pause: Duration) -> Self {
        Self {
            state: InteractionState::Idle,
            timer: None,
            next_timer_id: 1,
            pause,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn hovered(&self) -> Option<usize> {
        self.state.hovered()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn timer(&self) -> Option<&PauseTimer> {
        self.timer.as_ref()
    }

    pub fn pending_timers(&self) -> usize {
        usize::from(self.timer.is_some())
    }

    /// Run one frame and return the notifications it produced.
    pub fn advance(&mut self, now: Timestamp, hit: Option<usize>, clicks: usize) -> Vec<Notification> {
        let mut notifications = Vec::new();

        if self.timer.is_some_and(|t| now >= t.deadline) {
            notifications.extend(self.dispatch(Event::TimerElapsed, now));
        }
        notifications.extend(self.dispatch(Event::Hit(hit), now));
        for _ in 0..clicks {
            notifications.extend(self.dispatch(Event::Click, now));
        }

        log::trace!("Interaction at {}ms: {:?}", now.as_millis(), self.state);
        notifications
    }

    /// Feed a single event.
    pub fn dispatch(&mut self, event: Event, now: Timestamp) -> Vec<Notification> {
        let previous = self.state;
        let transition = reduce(previous, event, now, self.pause);
        self.state = transition.state;
        for op in transition.timer_ops {
            self.apply(op);
        }
        if previous != self.state {
            log::debug!("Interaction {:?} -> {:?} on {:?}", previous, self.state, event);
        }
        debug_assert_eq!(self.timer.is_some(), self.state.is_paused());
        transition.notifications
    }

    /// The view changed: every index is stale, so drop back to `Idle`.
    pub fn invalidate(&mut self) -> Vec<Notification> {
        let was_hovering = self.state.hovered().is_some();
        self.state = InteractionState::Idle;
        self.apply(TimerOp::Cancel);
        if was_hovering {
            vec![Notification::Hover(None)]
        } else {
            Vec::new()
        }
    }

    /// Cancel any outstanding timer (teardown).
    pub fn cancel(&mut self) {
        self.apply(TimerOp::Cancel);
        self.state = InteractionState::Idle;
    }

    fn apply(&mut self, op: TimerOp) {
        match op {
            TimerOp::Cancel => {
                if let Some(t) = self.timer.take() {
                    log::trace!("Cancelled pause timer {}", t.id);
                }
            }
            TimerOp::Schedule(deadline) => {
                // Replace, never stack
                self.apply(TimerOp::Cancel);
                let id = self.next_timer_id;
                self.next_timer_id += 1;
                self.timer = Some(PauseTimer { id, deadline });
                log::trace!("Scheduled pause timer {} for {}ms", id, deadline.as_millis());
            }
        }
    }
}

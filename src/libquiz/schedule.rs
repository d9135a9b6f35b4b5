use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Task {
    due: Instant,
    period: Option<Duration>,
}

/// Holds at most one pending task. Arming replaces whatever was pending,
/// so two timers for the same concern can never coexist.
#[derive(Debug, Default)]
pub struct Slot {
    task: Option<Task>,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_once(&mut self, now: Instant, delay: Duration) {
        self.task = Some(Task {
            due: now + delay,
            period: None,
        });
    }

    /// Zero periods are bumped to one millisecond so a repeating task cannot spin.
    pub fn arm_repeating(&mut self, now: Instant, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.task = Some(Task {
            due: now + period,
            period: Some(period),
        });
    }

    pub fn cancel(&mut self) {
        self.task = None;
    }

    pub fn due(&self) -> Option<Instant> {
        self.task.map(|t| t.due)
    }

    /// Consumes one firing if the task is due at `now`. Repeating tasks are
    /// rescheduled one period after their previous deadline, one-shot tasks are cleared.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        let Some(task) = self.task else {
            return false;
        };
        if task.due > now {
            return false;
        }
        self.task = task.period.map(|period| Task {
            due: task.due + period,
            period: Some(period),
        });
        true
    }
}

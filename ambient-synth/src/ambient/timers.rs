/// Handle returned by [`TimerQueue::set_interval`] and
/// [`TimerQueue::set_timeout`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer<A> {
    id: TimerId,
    due: u64,
    period: Option<u64>,
    action: A,
}

/// Interval and one-shot timers measured on the audio sample clock.
///
/// Nothing fires on its own: the owner calls [`TimerQueue::pop_due`] with the
/// current sample, typically from a host loop that ticks every few
/// milliseconds.
#[derive(Debug)]
pub struct TimerQueue<A> {
    next_id: u64,
    timers: Vec<Timer<A>>,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            timers: Vec::new(),
        }
    }
}

impl<A: Clone> TimerQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `action` every `period` samples, first at `now + period`.
    pub fn set_interval(&mut self, now: u64, period: u64, action: A) -> TimerId {
        let period = period.max(1);
        self.push(now + period, Some(period), action)
    }

    /// Fires `action` once at `now + delay`.
    pub fn set_timeout(&mut self, now: u64, delay: u64, action: A) -> TimerId {
        self.push(now + delay, None, action)
    }

    /// Cancels a timer. Returns false if it already fired or never existed.
    pub fn clear(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|timer| timer.id == id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Sample at which `id` fires next.
    pub fn due(&self, id: TimerId) -> Option<u64> {
        self.timers
            .iter()
            .find(|timer| timer.id == id)
            .map(|timer| timer.due)
    }

    /// Removes and returns the earliest timer due at or before `now`.
    /// Intervals are rescheduled; one that fell more than a period behind
    /// skips the missed ticks rather than firing them back to back.
    pub fn pop_due(&mut self, now: u64) -> Option<(TimerId, A)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.id.0))
            .map(|(index, _)| index)?;

        match self.timers[index].period {
            Some(period) => {
                let timer = &mut self.timers[index];
                timer.due += period;
                if timer.due <= now {
                    timer.due = now + period;
                }
                Some((timer.id, timer.action.clone()))
            }
            None => {
                let timer = self.timers.swap_remove(index);
                Some((timer.id, timer.action))
            }
        }
    }

    fn push(&mut self, due: u64, period: Option<u64>, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due,
            period,
            action,
        });
        id
    }
}

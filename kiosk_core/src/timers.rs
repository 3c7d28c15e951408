//! Cooperative one-shot timers advanced by the frame tick.
//!
//! There is no background clock: a queue only moves forward when its owner
//! calls [`TimerQueue::advance`], so every payload fires on the main tick
//! and a cancelled handle can never deliver a stale payload later.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct PendingTimer<T> {
    handle: TimerHandle,
    due: f64,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    now: f64,
    next_id: u64,
    pending: Vec<PendingTimer<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Seconds elapsed since the queue was created.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn schedule(&mut self, delay: f32, payload: T) -> TimerHandle {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            handle,
            due: self.now + f64::from(delay),
            payload,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.handle != handle);
        before != self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Moves the clock forward and returns every payload that came due,
    /// earliest first (ties keep scheduling order).
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        if dt.is_finite() && dt > 0.0 {
            self.now += f64::from(dt);
        }
        let now = self.now;
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due <= now + 1e-9 {
                due.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| {
            a.due
                .partial_cmp(&b.due)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.handle.cmp(&b.handle))
        });
        due.into_iter().map(|timer| timer.payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;

    #[test]
    fn fires_in_due_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(0.3, "late");
        queue.schedule(0.1, "early");
        queue.schedule(0.1, "early-second");
        assert!(queue.advance(0.05).is_empty());
        assert_eq!(queue.advance(0.3), vec!["early", "early-second", "late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(0.2, 1);
        queue.schedule(0.2, 2);
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert_eq!(queue.advance(1.0), vec![2]);
    }

    #[test]
    fn bad_delays_fire_on_next_advance() {
        let mut queue = TimerQueue::new();
        queue.schedule(f32::NAN, 'a');
        queue.schedule(-3.0, 'b');
        assert_eq!(queue.advance(0.0), vec!['a', 'b']);
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = TimerQueue::new();
        queue.schedule(0.1, ());
        queue.schedule(0.2, ());
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.advance(1.0).is_empty());
    }
}

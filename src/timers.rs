/// Delayed actions keyed on a monotonic clock.
///
/// Actions due at the same instant fire in the order they were scheduled.
#[derive(Clone, Debug)]
pub struct Timers<A> {
    pending: Vec<(f64, u64, A)>,
    seq: u64,
}

impl<A> Default for Timers<A> {
    fn default() -> Self {
        Timers {
            pending: Vec::new(),
            seq: 0,
        }
    }
}

impl<A> Timers<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, action: A) {
        self.pending.push((now_ms + delay_ms, self.seq, action));
        self.seq += 1;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Remove and return every action due at or before `now_ms`.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<A> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(at, _, _)| *at <= now_ms);
        self.pending = rest;
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        due.into_iter().map(|(_, _, action)| action).collect()
    }
}

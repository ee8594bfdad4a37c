use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

/// Pull-based dispenser of unit indices shared by every worker of a job.
///
/// The lock is held only for the read-compare-increment. Rendering happens
/// outside of it, so workers contend on index assignment and nothing else.
#[derive(Debug)]
pub struct WorkQueue {
    next: Mutex<usize>,
    total: usize,
    aborted: AtomicBool,
}

impl WorkQueue {
    pub fn new(total: usize) -> Self {
        Self {
            next: Mutex::new(0),
            total,
            aborted: AtomicBool::new(false),
        }
    }

    /// Claim the next unit, or `None` once the queue is exhausted or aborted.
    pub fn next(&self) -> Option<usize> {
        if self.is_aborted() {
            return None;
        }
        // The counter is a plain integer; a panic elsewhere cannot leave it torn.
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next < self.total {
            let index = *next;
            *next += 1;
            Some(index)
        } else {
            None
        }
    }

    /// Stop handing out units. In-flight units are unaffected.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of units handed out so far.
    pub fn claimed(&self) -> usize {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Barrier, thread};

    use super::*;

    #[test]
    fn hands_out_indices_in_order_then_exhausts() {
        let queue = WorkQueue::new(3);
        assert_eq!(queue.next(), Some(0));
        assert_eq!(queue.next(), Some(1));
        assert_eq!(queue.next(), Some(2));
        assert_eq!(queue.next(), None);
        assert_eq!(queue.next(), None);
        assert_eq!(queue.claimed(), 3);
    }

    #[test]
    fn empty_queue_is_exhausted_immediately() {
        let queue = WorkQueue::new(0);
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn concurrent_callers_see_every_index_exactly_once() {
        const TOTAL: usize = 10_000;
        const CALLERS: usize = 16;

        let queue = WorkQueue::new(TOTAL);
        let barrier = Barrier::new(CALLERS);

        let claims: Vec<Vec<usize>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        let mut claimed = Vec::new();
                        while let Some(index) = queue.next() {
                            claimed.push(index);
                        }
                        claimed
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("caller thread"))
                .collect()
        });

        let all: Vec<usize> = claims.into_iter().flatten().collect();
        assert_eq!(all.len(), TOTAL);
        let unique: BTreeSet<usize> = all.iter().copied().collect();
        assert_eq!(unique, (0..TOTAL).collect::<BTreeSet<_>>());
    }

    #[test]
    fn abort_stops_further_claims() {
        let queue = WorkQueue::new(5);
        assert_eq!(queue.next(), Some(0));
        queue.abort();
        assert!(queue.is_aborted());
        assert_eq!(queue.next(), None);
        assert_eq!(queue.claimed(), 1);
    }
}

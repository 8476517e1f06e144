use crate::sync::Interrupted;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SemaphoreState {
    no_permits_free: u32,
    waiters: VecDeque<u64>,
    next_ticket: u64,
    closed: bool,
}

/// FairSemaphore guards a multi-slot track segment (chicane, both ends of the pit lane). Permits
/// are handed out in arrival order: a waiter is admitted once a permit is free and every earlier
/// waiter has been served. The conservation invariant is permits in flight + permits free =
/// capacity.
///
/// A release wakes all waiters, but only the queue head can take the freed permit; everybody
/// else revalidates its predicate and goes back to sleep, which keeps the wait loops safe
/// against spurious wakeups. A car is expected to release its own permit; ownership is by
/// convention, not enforced.
#[derive(Debug)]
pub struct FairSemaphore {
    capacity: u32,
    state: Mutex<SemaphoreState>,
    permit_freed: Condvar,
}

impl FairSemaphore {
    pub fn new(capacity: u32) -> FairSemaphore {
        if capacity == 0 {
            panic!("Capacity of a fair semaphore must be at least 1!")
        }

        FairSemaphore {
            capacity,
            state: Mutex::new(SemaphoreState {
                no_permits_free: capacity,
                waiters: VecDeque::new(),
                next_ticket: 0,
                closed: false,
            }),
            permit_freed: Condvar::new(),
        }
    }

    /// acquire blocks until a permit is free and the calling car is first in line.
    pub fn acquire(&self, car_no: u32) -> Result<(), Interrupted> {
        let mut state = self.state.lock().expect("Fair semaphore lock poisoned!");

        if state.closed {
            return Err(Interrupted);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);

        while !(state.no_permits_free > 0 && state.waiters.front() == Some(&ticket)) {
            if state.closed {
                Self::remove_ticket(&mut state.waiters, ticket);
                self.permit_freed.notify_all();
                return Err(Interrupted);
            }

            state = self
                .permit_freed
                .wait(state)
                .expect("Fair semaphore lock poisoned!");
        }

        state.waiters.pop_front();
        state.no_permits_free -= 1;
        log::trace!("car {}: acquired semaphore permit", car_no);

        // a further permit may be free for the new queue head
        if state.no_permits_free > 0 && !state.waiters.is_empty() {
            self.permit_freed.notify_all();
        }

        Ok(())
    }

    /// try_acquire is the zero-wait variant: it succeeds only when nobody queues and a permit is
    /// free.
    pub fn try_acquire(&self, car_no: u32) -> bool {
        let mut state = self.state.lock().expect("Fair semaphore lock poisoned!");

        if state.closed || state.no_permits_free == 0 || !state.waiters.is_empty() {
            return false;
        }

        state.no_permits_free -= 1;
        log::trace!("car {}: acquired semaphore permit on the fast path", car_no);
        true
    }

    /// try_acquire_for waits for a permit up to the inserted timeout. Returns false if the
    /// timeout elapsed without an admission.
    pub fn try_acquire_for(&self, car_no: u32, timeout: Duration) -> Result<bool, Interrupted> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("Fair semaphore lock poisoned!");

        if state.closed {
            return Err(Interrupted);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);

        loop {
            if state.no_permits_free > 0 && state.waiters.front() == Some(&ticket) {
                state.waiters.pop_front();
                state.no_permits_free -= 1;
                log::trace!("car {}: acquired semaphore permit within the deadline", car_no);

                if state.no_permits_free > 0 && !state.waiters.is_empty() {
                    self.permit_freed.notify_all();
                }

                return Ok(true);
            }

            if state.closed {
                Self::remove_ticket(&mut state.waiters, ticket);
                self.permit_freed.notify_all();
                return Err(Interrupted);
            }

            let now = Instant::now();
            if now >= deadline {
                Self::remove_ticket(&mut state.waiters, ticket);
                self.permit_freed.notify_all();
                return Ok(false);
            }

            let (guard, _timeout_result) = self
                .permit_freed
                .wait_timeout(state, deadline - now)
                .expect("Fair semaphore lock poisoned!");
            state = guard;
        }
    }

    /// release returns a permit and wakes the waiters so the queue head can take it. Releasing
    /// more permits than the configured capacity is a protocol violation.
    pub fn release(&self, car_no: u32) {
        let mut state = self.state.lock().expect("Fair semaphore lock poisoned!");

        if state.no_permits_free >= self.capacity {
            panic!("Tried to release a semaphore permit without a matching acquire!")
        }

        state.no_permits_free += 1;
        log::trace!("car {}: released semaphore permit", car_no);
        self.permit_freed.notify_all();
    }

    /// no_permits_free returns the number of currently available permits.
    pub fn no_permits_free(&self) -> u32 {
        let state = self.state.lock().expect("Fair semaphore lock poisoned!");
        state.no_permits_free
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// shutdown wakes every waiter with an interruption; subsequent acquire calls fail
    /// immediately.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("Fair semaphore lock poisoned!");
        state.closed = true;
        self.permit_freed.notify_all();
    }

    fn remove_ticket(waiters: &mut VecDeque<u64>, ticket: u64) {
        if let Some(pos) = waiters.iter().position(|&waiting| waiting == ticket) {
            waiters.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FairSemaphore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn capacity_is_never_exceeded() {
        // eight workers hammer a capacity-2 semaphore; the observed number of concurrent holders
        // must never exceed two
        let semaphore = Arc::new(FairSemaphore::new(2));
        let no_inside = Arc::new(AtomicU32::new(0));
        let max_inside = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (1..=8)
            .map(|car_no| {
                let semaphore = Arc::clone(&semaphore);
                let no_inside = Arc::clone(&no_inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..5 {
                        semaphore.acquire(car_no).unwrap();
                        let inside = no_inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(inside, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        no_inside.fetch_sub(1, Ordering::SeqCst);
                        semaphore.release(car_no);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 2);
        assert_eq!(semaphore.no_permits_free(), 2);
    }

    #[test]
    fn head_is_admitted_on_first_release() {
        // A and B take the two permits, C blocks; A releases at ~300ms, B at ~500ms -> C must be
        // admitted on A's release already
        let semaphore = Arc::new(FairSemaphore::new(2));
        semaphore.acquire(1).unwrap();
        semaphore.acquire(2).unwrap();

        let t_start = Instant::now();
        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || {
                semaphore.acquire(3).unwrap();
                let t_admitted = t_start.elapsed();
                semaphore.release(3);
                t_admitted
            })
        };

        thread::sleep(Duration::from_millis(300));
        semaphore.release(1);
        thread::sleep(Duration::from_millis(200));
        semaphore.release(2);

        let t_admitted = waiter.join().unwrap();
        assert!(
            t_admitted >= Duration::from_millis(290) && t_admitted <= Duration::from_millis(450),
            "admission took {:?}, expected roughly 300ms",
            t_admitted
        );
    }

    #[test]
    fn waiters_are_admitted_in_arrival_order() {
        let semaphore = Arc::new(FairSemaphore::new(1));
        let admission_log = Arc::new(std::sync::Mutex::new(Vec::new()));
        semaphore.acquire(99).unwrap();

        let handles: Vec<_> = (1..=5)
            .map(|car_no| {
                let semaphore = Arc::clone(&semaphore);
                let admission_log = Arc::clone(&admission_log);
                let handle = thread::spawn(move || {
                    semaphore.acquire(car_no).unwrap();
                    admission_log.lock().unwrap().push(car_no);
                    semaphore.release(car_no);
                });
                thread::sleep(Duration::from_millis(30));
                handle
            })
            .collect();

        semaphore.release(99);

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*admission_log.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bounded_wait_times_out_in_bounds() {
        let semaphore = Arc::new(FairSemaphore::new(1));
        semaphore.acquire(1).unwrap();

        let t_start = Instant::now();
        let admitted = semaphore
            .try_acquire_for(2, Duration::from_millis(200))
            .unwrap();
        let elapsed = t_start.elapsed();

        assert!(!admitted);
        assert!(
            elapsed >= Duration::from_millis(200) && elapsed <= Duration::from_millis(350),
            "timeout took {:?}",
            elapsed
        );

        // the timed-out ticket must not block later admissions
        semaphore.release(1);
        assert!(semaphore.try_acquire(3));
        semaphore.release(3);
    }

    #[test]
    fn try_acquire_respects_queue() {
        let semaphore = Arc::new(FairSemaphore::new(2));
        semaphore.acquire(1).unwrap();
        semaphore.acquire(2).unwrap();

        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || semaphore.acquire(3).unwrap())
        };
        thread::sleep(Duration::from_millis(30));

        semaphore.release(1);
        waiter.join().unwrap();

        // cars 2 and 3 hold the permits now; the fast path must fail until one frees up
        assert!(!semaphore.try_acquire(4));
        semaphore.release(2);
        assert!(semaphore.try_acquire(4));
        assert!(!semaphore.try_acquire(5));
        semaphore.release(3);
        semaphore.release(4);
    }

    #[test]
    #[should_panic(expected = "without a matching acquire")]
    fn double_release_is_fatal() {
        let semaphore = FairSemaphore::new(2);
        semaphore.acquire(1).unwrap();
        semaphore.release(1);
        semaphore.release(1);
    }

    #[test]
    fn shutdown_interrupts_waiters() {
        let semaphore = Arc::new(FairSemaphore::new(1));
        semaphore.acquire(1).unwrap();

        let blocked = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || semaphore.acquire(2))
        };
        thread::sleep(Duration::from_millis(30));

        semaphore.shutdown();
        assert!(blocked.join().unwrap().is_err());
        assert!(!semaphore.try_acquire(3));
    }
}

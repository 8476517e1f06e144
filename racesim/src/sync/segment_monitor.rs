use crate::sync::Interrupted;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct MonitorState {
    occupied: bool,
    waiters: VecDeque<u32>,
    closed: bool,
}

/// SegmentMonitor guards a single-slot track segment (tight turn). Admission is strict FIFO: a
/// car is admitted once the slot is free and it is at the head of the waiter queue, even if a
/// later arrival could take the free slot without conflict. Waiters revalidate the admission
/// predicate on every wake, so spurious wakeups are harmless.
#[derive(Debug, Default)]
pub struct SegmentMonitor {
    state: Mutex<MonitorState>,
    admitted: Condvar,
}

impl SegmentMonitor {
    pub fn new() -> SegmentMonitor {
        Default::default()
    }

    /// enter suspends the calling car until it holds the slot.
    pub fn enter(&self, car_no: u32) -> Result<(), Interrupted> {
        let mut state = self.state.lock().expect("Segment monitor lock poisoned!");

        if state.closed {
            return Err(Interrupted);
        }

        state.waiters.push_back(car_no);

        while !(!state.occupied && state.waiters.front() == Some(&car_no)) {
            if state.closed {
                Self::remove_waiter(&mut state.waiters, car_no);
                self.admitted.notify_all();
                return Err(Interrupted);
            }

            state = self
                .admitted
                .wait(state)
                .expect("Segment monitor lock poisoned!");
        }

        state.waiters.pop_front();
        state.occupied = true;
        log::trace!("car {}: admitted to single-slot segment", car_no);
        Ok(())
    }

    /// try_enter is the non-blocking fast path: it succeeds only when the waiter queue is empty
    /// and the slot is free.
    pub fn try_enter(&self, car_no: u32) -> bool {
        let mut state = self.state.lock().expect("Segment monitor lock poisoned!");

        if state.closed || state.occupied || !state.waiters.is_empty() {
            return false;
        }

        state.occupied = true;
        log::trace!("car {}: took single-slot segment on the fast path", car_no);
        true
    }

    /// leave frees the slot and wakes all waiters so the new head can re-evaluate its predicate.
    /// Calling leave without a prior enter is a protocol violation.
    pub fn leave(&self, car_no: u32) {
        let mut state = self.state.lock().expect("Segment monitor lock poisoned!");

        if !state.occupied {
            panic!("Tried to leave a segment monitor without a prior enter!")
        }

        state.occupied = false;
        log::trace!("car {}: left single-slot segment", car_no);
        self.admitted.notify_all();
    }

    /// no_occupants returns the number of cars currently holding the slot (0 or 1).
    pub fn no_occupants(&self) -> u32 {
        let state = self.state.lock().expect("Segment monitor lock poisoned!");
        state.occupied as u32
    }

    /// shutdown wakes every waiter with an interruption; subsequent enter calls fail immediately.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("Segment monitor lock poisoned!");
        state.closed = true;
        self.admitted.notify_all();
    }

    fn remove_waiter(waiters: &mut VecDeque<u32>, car_no: u32) {
        if let Some(pos) = waiters.iter().position(|&waiter| waiter == car_no) {
            waiters.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentMonitor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn contended_slot_admits_one_at_a_time() {
        // two workers enter a capacity-1 monitor at the same time and hold it for 100ms each:
        // the maximum observed occupancy must stay at one and the total elapsed time must cover
        // both holds back to back
        let monitor = Arc::new(SegmentMonitor::new());
        let max_observed = Arc::new(AtomicU32::new(0));
        let t_start = Instant::now();

        let handles: Vec<_> = (1..=2)
            .map(|car_no| {
                let monitor = Arc::clone(&monitor);
                let max_observed = Arc::clone(&max_observed);
                thread::spawn(move || {
                    monitor.enter(car_no).unwrap();
                    let occupants = monitor.no_occupants();
                    max_observed.fetch_max(occupants, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(100));
                    monitor.leave(car_no);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_observed.load(Ordering::SeqCst), 1);
        assert!(t_start.elapsed() >= Duration::from_millis(200));
        assert_eq!(monitor.no_occupants(), 0);
    }

    #[test]
    fn admission_respects_queue_order() {
        let monitor = Arc::new(SegmentMonitor::new());
        let admission_log = Arc::new(std::sync::Mutex::new(Vec::new()));

        monitor.enter(99).unwrap();

        // queue three waiters with a staggered, known arrival order
        let handles: Vec<_> = (1..=3)
            .map(|car_no| {
                let monitor = Arc::clone(&monitor);
                let admission_log = Arc::clone(&admission_log);
                let handle = thread::spawn(move || {
                    monitor.enter(car_no).unwrap();
                    admission_log.lock().unwrap().push(car_no);
                    monitor.leave(car_no);
                });
                thread::sleep(Duration::from_millis(30));
                handle
            })
            .collect();

        monitor.leave(99);

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*admission_log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn try_enter_fails_while_waiters_queue() {
        let monitor = Arc::new(SegmentMonitor::new());

        assert!(monitor.try_enter(1));
        // slot taken -> fast path must fail
        assert!(!monitor.try_enter(2));

        let waiter = {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || monitor.enter(3).unwrap())
        };
        thread::sleep(Duration::from_millis(30));

        monitor.leave(1);
        waiter.join().unwrap();

        // car 3 holds the slot now, queue is empty again
        assert!(!monitor.try_enter(4));
        monitor.leave(3);
        assert!(monitor.try_enter(4));
        monitor.leave(4);
    }

    #[test]
    #[should_panic(expected = "without a prior enter")]
    fn leave_without_enter_is_fatal() {
        let monitor = SegmentMonitor::new();
        monitor.leave(1);
    }

    #[test]
    fn shutdown_interrupts_waiters() {
        let monitor = Arc::new(SegmentMonitor::new());
        monitor.enter(1).unwrap();

        let blocked = {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || monitor.enter(2))
        };
        thread::sleep(Duration::from_millis(30));

        monitor.shutdown();
        assert!(blocked.join().unwrap().is_err());
    }
}

use crate::sync::Interrupted;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LatchState {
    released: bool,
    closed: bool,
}

/// StartLatch gates every car worker on the grid until the director releases the field. The
/// latch is single-shot: release is idempotent, all workers blocked in await_release are admitted
/// together, and workers arriving after the release pass through without blocking. A new race
/// gets a fresh latch.
#[derive(Debug, Default)]
pub struct StartLatch {
    state: Mutex<LatchState>,
    released_cv: Condvar,
}

impl StartLatch {
    pub fn new() -> StartLatch {
        Default::default()
    }

    /// await_release blocks the calling car until the latch is released.
    pub fn await_release(&self, car_no: u32) -> Result<(), Interrupted> {
        let mut state = self.state.lock().expect("Start latch lock poisoned!");

        while !state.released {
            if state.closed {
                return Err(Interrupted);
            }
            state = self
                .released_cv
                .wait(state)
                .expect("Start latch lock poisoned!");
        }

        log::trace!("car {}: released from the grid", car_no);
        Ok(())
    }

    /// release opens the latch. The first call transitions, every further call is a no-op.
    pub fn release(&self) {
        let mut state = self.state.lock().expect("Start latch lock poisoned!");

        if !state.released {
            state.released = true;
            self.released_cv.notify_all();
        }
    }

    /// is_released returns true once the latch has been opened.
    pub fn is_released(&self) -> bool {
        let state = self.state.lock().expect("Start latch lock poisoned!");
        state.released
    }

    /// shutdown wakes all waiters with an interruption without releasing the latch.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("Start latch lock poisoned!");
        state.closed = true;
        self.released_cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::StartLatch;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn all_waiters_leave_together_on_release() {
        let latch = Arc::new(StartLatch::new());
        let no_away = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (1..=20)
            .map(|car_no| {
                let latch = Arc::clone(&latch);
                let no_away = Arc::clone(&no_away);
                thread::spawn(move || {
                    latch.await_release(car_no).unwrap();
                    no_away.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        // give all workers time to reach the latch
        thread::sleep(Duration::from_millis(100));
        assert_eq!(no_away.load(Ordering::SeqCst), 0);

        let t_release = Instant::now();
        latch.release();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(no_away.load(Ordering::SeqCst), 20);
        assert!(t_release.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn release_is_idempotent() {
        let latch = StartLatch::new();
        latch.release();
        latch.release();
        assert!(latch.is_released());
        // late arrivals pass through without blocking
        latch.await_release(7).unwrap();
    }

    #[test]
    fn shutdown_interrupts_grid() {
        let latch = Arc::new(StartLatch::new());

        let blocked = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || latch.await_release(1))
        };
        thread::sleep(Duration::from_millis(30));

        latch.shutdown();
        assert!(blocked.join().unwrap().is_err());
    }
}

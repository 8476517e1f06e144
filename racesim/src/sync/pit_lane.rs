use crate::sync::fair_semaphore::FairSemaphore;
use crate::sync::Interrupted;
use std::sync::atomic::{AtomicU32, Ordering};

/// PitLane couples the two fair semaphores guarding the pit entry and the pit exit with a counter
/// of cars currently inside the lane. The two semaphores are independent so that a car leaving
/// may proceed even while the entrance is saturated.
///
/// Sequence from the car's side: acquire entry permit -> traverse the pit-entry segment ->
/// release entry permit -> service at the box -> acquire exit permit -> traverse the pit-exit
/// segment -> release exit permit.
#[derive(Debug)]
pub struct PitLane {
    entry: FairSemaphore,
    exit: FairSemaphore,
    no_cars_inside: AtomicU32,
}

impl PitLane {
    pub fn new(entry_capacity: u32, exit_capacity: u32) -> PitLane {
        PitLane {
            entry: FairSemaphore::new(entry_capacity),
            exit: FairSemaphore::new(exit_capacity),
            no_cars_inside: AtomicU32::new(0),
        }
    }

    /// acquire_entry admits the car into the pit lane.
    pub fn acquire_entry(&self, car_no: u32) -> Result<(), Interrupted> {
        self.entry.acquire(car_no)?;
        self.no_cars_inside.fetch_add(1, Ordering::SeqCst);
        log::debug!("car {}: entered the pit lane", car_no);
        Ok(())
    }

    /// release_entry frees the entry permit once the pit-entry segment is traversed.
    pub fn release_entry(&self, car_no: u32) {
        self.entry.release(car_no);
    }

    /// acquire_exit admits the car to the pit-exit segment.
    pub fn acquire_exit(&self, car_no: u32) -> Result<(), Interrupted> {
        self.exit.acquire(car_no)
    }

    /// release_exit frees the exit permit; the car has left the pit lane.
    pub fn release_exit(&self, car_no: u32) {
        self.exit.release(car_no);
        self.no_cars_inside.fetch_sub(1, Ordering::SeqCst);
        log::debug!("car {}: left the pit lane", car_no);
    }

    /// no_cars_inside returns the number of cars currently between pit entry and pit exit.
    pub fn no_cars_inside(&self) -> u32 {
        self.no_cars_inside.load(Ordering::SeqCst)
    }

    /// shutdown wakes all waiters at both ends with an interruption.
    pub fn shutdown(&self) {
        self.entry.shutdown();
        self.exit.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::PitLane;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn counter_tracks_cars_inside() {
        let pit_lane = PitLane::new(3, 3);

        pit_lane.acquire_entry(1).unwrap();
        pit_lane.release_entry(1);
        pit_lane.acquire_entry(2).unwrap();
        pit_lane.release_entry(2);
        assert_eq!(pit_lane.no_cars_inside(), 2);

        pit_lane.acquire_exit(1).unwrap();
        pit_lane.release_exit(1);
        assert_eq!(pit_lane.no_cars_inside(), 1);

        pit_lane.acquire_exit(2).unwrap();
        pit_lane.release_exit(2);
        assert_eq!(pit_lane.no_cars_inside(), 0);
    }

    #[test]
    fn exit_works_while_entry_is_saturated() {
        // three cars hold all entry permits; a serviced car must still get out
        let pit_lane = Arc::new(PitLane::new(3, 3));

        pit_lane.acquire_entry(10).unwrap();
        pit_lane.release_entry(10);
        for car_no in 1..=3 {
            pit_lane.acquire_entry(car_no).unwrap();
        }

        let leaver = {
            let pit_lane = Arc::clone(&pit_lane);
            thread::spawn(move || {
                pit_lane.acquire_exit(10).unwrap();
                pit_lane.release_exit(10);
            })
        };

        leaver.join().unwrap();
        assert_eq!(pit_lane.no_cars_inside(), 3);
        for car_no in 1..=3 {
            pit_lane.release_entry(car_no);
        }
    }

    #[test]
    fn shutdown_interrupts_both_ends() {
        let pit_lane = Arc::new(PitLane::new(1, 1));
        pit_lane.acquire_entry(1).unwrap();

        let blocked = {
            let pit_lane = Arc::clone(&pit_lane);
            thread::spawn(move || pit_lane.acquire_entry(2))
        };
        thread::sleep(Duration::from_millis(30));

        pit_lane.shutdown();
        assert!(blocked.join().unwrap().is_err());
    }
}

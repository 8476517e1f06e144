pub mod fair_semaphore;
pub mod pit_box;
pub mod pit_lane;
pub mod segment_monitor;
pub mod start_latch;

use crate::sync::fair_semaphore::FairSemaphore;
use crate::sync::segment_monitor::SegmentMonitor;
use std::error::Error;
use std::fmt;

/// Interrupted is returned by a blocking primitive operation if the race-wide shutdown fan-out
/// woke the waiter. The caller must return cleanly without touching the primitive again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Interrupted while waiting on a synchronization primitive")
    }
}

impl Error for Interrupted {}

/// SegmentGate dispatches the admission protocol per segment: tight turns get the single-slot
/// monitor, chicanes the fair semaphore, everything else is free to enter. The pit entry and exit
/// are gated by the pit lane semaphores instead and therefore stay open here.
#[derive(Debug)]
pub enum SegmentGate {
    Open,
    Monitor(SegmentMonitor),
    Semaphore(FairSemaphore),
}

impl SegmentGate {
    /// enter blocks until the calling car is admitted to the segment.
    pub fn enter(&self, car_no: u32) -> Result<(), Interrupted> {
        match self {
            SegmentGate::Open => Ok(()),
            SegmentGate::Monitor(monitor) => monitor.enter(car_no),
            SegmentGate::Semaphore(semaphore) => semaphore.acquire(car_no),
        }
    }

    /// try_enter is the non-blocking fast path of enter.
    pub fn try_enter(&self, car_no: u32) -> bool {
        match self {
            SegmentGate::Open => true,
            SegmentGate::Monitor(monitor) => monitor.try_enter(car_no),
            SegmentGate::Semaphore(semaphore) => semaphore.try_acquire(car_no),
        }
    }

    /// leave gives the admission back and wakes the next waiter in line.
    pub fn leave(&self, car_no: u32) {
        match self {
            SegmentGate::Open => {}
            SegmentGate::Monitor(monitor) => monitor.leave(car_no),
            SegmentGate::Semaphore(semaphore) => semaphore.release(car_no),
        }
    }

    /// is_gated returns true if entering this segment can block.
    pub fn is_gated(&self) -> bool {
        !matches!(self, SegmentGate::Open)
    }

    /// shutdown wakes every waiter with an interruption.
    pub fn shutdown(&self) {
        match self {
            SegmentGate::Open => {}
            SegmentGate::Monitor(monitor) => monitor.shutdown(),
            SegmentGate::Semaphore(semaphore) => semaphore.shutdown(),
        }
    }
}

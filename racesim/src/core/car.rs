use crate::core::driver::Driver;
use crate::core::tireset::Compound;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// CarStatus is published by the car worker so that the ordering function, the director, the
/// strategists, and the view can read a consistent-enough picture without locking.
///
/// `Retired` is reserved: no code path sets it today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarStatus {
    Grid,
    Running,
    WaitingForSegment,
    InCritical,
    InOvertakeZone,
    EnteringPit,
    InBox,
    LeavingPit,
    Finished,
    Retired,
}

impl CarStatus {
    pub fn as_u8(self) -> u8 {
        match self {
            CarStatus::Grid => 0,
            CarStatus::Running => 1,
            CarStatus::WaitingForSegment => 2,
            CarStatus::InCritical => 3,
            CarStatus::InOvertakeZone => 4,
            CarStatus::EnteringPit => 5,
            CarStatus::InBox => 6,
            CarStatus::LeavingPit => 7,
            CarStatus::Finished => 8,
            CarStatus::Retired => 9,
        }
    }

    pub fn from_u8(id: u8) -> CarStatus {
        match id {
            0 => CarStatus::Grid,
            1 => CarStatus::Running,
            2 => CarStatus::WaitingForSegment,
            3 => CarStatus::InCritical,
            4 => CarStatus::InOvertakeZone,
            5 => CarStatus::EnteringPit,
            6 => CarStatus::InBox,
            7 => CarStatus::LeavingPit,
            8 => CarStatus::Finished,
            9 => CarStatus::Retired,
            _ => panic!("Unknown car status id {}!", id),
        }
    }
}

/// * `car_no` - Car start number
/// * `team` - Team name (must match a team entry)
/// * `driver_initials` - Initials of the driver (must match a driver entry)
/// * `start_compound` - Compound mounted for the race start
#[derive(Debug, Deserialize, Clone)]
pub struct CarPars {
    pub car_no: u32,
    pub team: String,
    pub driver_initials: String,
    pub start_compound: Compound,
}

const PROGRESS_SCALE: f64 = 1_000_000.0;
const WEAR_SCALE: f64 = 1_000.0;

/// Car is the record shared between the car worker (owner of all writes except the documented
/// channels), the strategist (writes the pit request), and the concurrent readers (ordering,
/// director, view). Every cross-thread field is published atomically; progress is stored in
/// millionths, tire wear in thousandths of a percent.
///
/// The pit request is a single-writer/single-reader channel: the strategist publishes the
/// compound before flipping the flag, the car worker reads and clears the flag at the pit
/// branch.
#[derive(Debug)]
pub struct Car {
    pub car_no: u32,
    pub team_id: usize,
    pub driver: Arc<Driver>,
    pub start_compound: Compound,
    status: AtomicU8,
    cur_segment: AtomicUsize,
    progress: AtomicU32,
    cur_lap: AtomicU32,
    compl_laps: AtomicU32,
    no_pitstops: AtomicU32,
    mandatory_pit_done: AtomicBool,
    pit_requested: AtomicBool,
    pit_compound: AtomicU8,
    finished: AtomicBool,
    tire_compound: AtomicU8,
    tire_wear: AtomicU32,
    p_grid: AtomicU32,
    t_last_lap: AtomicU64,
    t_best_lap: AtomicU64,
    t_race: AtomicU64,
}

impl Car {
    pub fn new(car_pars: &CarPars, team_id: usize, driver: Arc<Driver>) -> Car {
        Car {
            car_no: car_pars.car_no,
            team_id,
            driver,
            start_compound: car_pars.start_compound,
            status: AtomicU8::new(CarStatus::Grid.as_u8()),
            cur_segment: AtomicUsize::new(0),
            progress: AtomicU32::new(0),
            cur_lap: AtomicU32::new(1),
            compl_laps: AtomicU32::new(0),
            no_pitstops: AtomicU32::new(0),
            mandatory_pit_done: AtomicBool::new(false),
            pit_requested: AtomicBool::new(false),
            pit_compound: AtomicU8::new(car_pars.start_compound.as_u8()),
            finished: AtomicBool::new(false),
            tire_compound: AtomicU8::new(car_pars.start_compound.as_u8()),
            tire_wear: AtomicU32::new(0),
            p_grid: AtomicU32::new(0),
            t_last_lap: AtomicU64::new(0),
            t_best_lap: AtomicU64::new(0),
            t_race: AtomicU64::new(0),
        }
    }

    // STATUS AND POSITION -------------------------------------------------------------------------

    pub fn status(&self) -> CarStatus {
        CarStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: CarStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }

    pub fn cur_segment(&self) -> usize {
        self.cur_segment.load(Ordering::SeqCst)
    }

    /// set_cur_segment publishes the move into a new segment. Progress is cleared before the
    /// segment id advances so a concurrent reader never sees the new segment with stale
    /// progress.
    pub fn set_cur_segment(&self, segment_id: usize) {
        self.progress.store(0, Ordering::SeqCst);
        self.cur_segment.store(segment_id, Ordering::SeqCst);
    }

    pub fn progress(&self) -> f64 {
        f64::from(self.progress.load(Ordering::Relaxed)) / PROGRESS_SCALE
    }

    pub fn set_progress(&self, progress: f64) {
        let clamped = progress.max(0.0).min(1.0);
        self.progress
            .store((clamped * PROGRESS_SCALE) as u32, Ordering::Relaxed);
    }

    pub fn cur_lap(&self) -> u32 {
        self.cur_lap.load(Ordering::SeqCst)
    }

    pub fn compl_laps(&self) -> u32 {
        self.compl_laps.load(Ordering::SeqCst)
    }

    // LAP TIMING ----------------------------------------------------------------------------------

    /// close_lap publishes a completed lap: counters first, then the timing fields.
    pub fn close_lap(&self, t_lap_ms: u64) {
        self.compl_laps.fetch_add(1, Ordering::SeqCst);
        self.cur_lap.fetch_add(1, Ordering::SeqCst);
        self.t_last_lap.store(t_lap_ms, Ordering::SeqCst);
        self.t_race.fetch_add(t_lap_ms, Ordering::SeqCst);

        let t_best = self.t_best_lap.load(Ordering::SeqCst);
        if t_best == 0 || t_lap_ms < t_best {
            self.t_best_lap.store(t_lap_ms, Ordering::SeqCst);
        }
    }

    pub fn t_last_lap(&self) -> Option<u64> {
        match self.t_last_lap.load(Ordering::SeqCst) {
            0 => None,
            t_lap => Some(t_lap),
        }
    }

    pub fn t_best_lap(&self) -> Option<u64> {
        match self.t_best_lap.load(Ordering::SeqCst) {
            0 => None,
            t_lap => Some(t_lap),
        }
    }

    pub fn t_race(&self) -> u64 {
        self.t_race.load(Ordering::SeqCst)
    }

    // TIRES ---------------------------------------------------------------------------------------

    /// publish_tires mirrors the worker-owned tireset into the atomic fields read by the
    /// strategist and the overtake arbiter.
    pub fn publish_tires(&self, compound: Compound, wear: f64) {
        self.tire_compound.store(compound.as_u8(), Ordering::SeqCst);
        self.tire_wear
            .store((wear * WEAR_SCALE) as u32, Ordering::SeqCst);
    }

    pub fn tire_compound(&self) -> Compound {
        Compound::from_u8(self.tire_compound.load(Ordering::SeqCst))
    }

    pub fn tire_wear(&self) -> f64 {
        f64::from(self.tire_wear.load(Ordering::SeqCst)) / WEAR_SCALE
    }

    /// tire_speed_factor recomputes the published pace multiplier of the mounted set.
    pub fn tire_speed_factor(&self) -> f64 {
        self.tire_compound().base_speed_factor() * (1.0 - 0.2 * self.tire_wear() / 100.0)
    }

    // PIT -----------------------------------------------------------------------------------------

    /// request_pitstop is the strategist's only cross-thread write: the compound is published
    /// before the flag so the car worker always reads a consistent pair.
    pub fn request_pitstop(&self, compound: Compound) {
        self.pit_compound.store(compound.as_u8(), Ordering::SeqCst);
        self.pit_requested.store(true, Ordering::SeqCst);
    }

    pub fn has_pit_request(&self) -> bool {
        self.pit_requested.load(Ordering::SeqCst)
    }

    /// take_pit_request reads and clears the pit request; only the car worker calls this.
    pub fn take_pit_request(&self) -> Option<Compound> {
        if self.pit_requested.swap(false, Ordering::SeqCst) {
            Some(Compound::from_u8(self.pit_compound.load(Ordering::SeqCst)))
        } else {
            None
        }
    }

    /// record_pitstop counts a completed stop and marks the mandatory stop as done.
    pub fn record_pitstop(&self) {
        self.no_pitstops.fetch_add(1, Ordering::SeqCst);
        self.mandatory_pit_done.store(true, Ordering::SeqCst);
    }

    pub fn no_pitstops(&self) -> u32 {
        self.no_pitstops.load(Ordering::SeqCst)
    }

    pub fn mandatory_pit_done(&self) -> bool {
        self.mandatory_pit_done.load(Ordering::SeqCst)
    }

    // RACE END ------------------------------------------------------------------------------------

    pub fn set_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    // GRID ----------------------------------------------------------------------------------------

    pub fn p_grid(&self) -> u32 {
        self.p_grid.load(Ordering::SeqCst)
    }

    pub fn set_p_grid(&self, p_grid: u32) {
        self.p_grid.store(p_grid, Ordering::SeqCst);
    }

    // ORDERING ------------------------------------------------------------------------------------

    /// ordering_key returns the live-ordering sort key (completed laps, segment id, progress).
    /// The reads are unsynchronized with respect to each other; the bounded staleness between
    /// them is tolerated by the leaderboard.
    pub fn ordering_key(&self) -> (u32, usize, f64) {
        (self.compl_laps(), self.cur_segment(), self.progress())
    }
}

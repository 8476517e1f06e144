use crate::core::car::{Car, CarStatus};
use crate::core::team::Team;
use crate::core::track::Track;
use crate::interfaces::view_interface::RgbColor;
use crate::post::race_result::{LapRecord, ResultEntry};
use helpers::general::{argsort, scale_millis, SortOrder};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// * `tot_no_laps` - Total number of laps in the race
/// * `participants` - List of participants (car numbers) in the current race (the respective car
/// parameters must be available)
#[derive(Debug, serde::Deserialize, Clone)]
pub struct RacePars {
    pub tot_no_laps: u32,
    pub participants: Vec<u32>,
}

/// RaceStatus is the race-wide lifecycle state, published atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceStatus {
    Preparing,
    StartPhase,
    Running,
    Paused,
    Aborted,
    Finished,
}

impl RaceStatus {
    pub fn as_u8(self) -> u8 {
        match self {
            RaceStatus::Preparing => 0,
            RaceStatus::StartPhase => 1,
            RaceStatus::Running => 2,
            RaceStatus::Paused => 3,
            RaceStatus::Aborted => 4,
            RaceStatus::Finished => 5,
        }
    }

    pub fn from_u8(id: u8) -> RaceStatus {
        match id {
            0 => RaceStatus::Preparing,
            1 => RaceStatus::StartPhase,
            2 => RaceStatus::Running,
            3 => RaceStatus::Paused,
            4 => RaceStatus::Aborted,
            5 => RaceStatus::Finished,
            _ => panic!("Unknown race status id {}!", id),
        }
    }
}

/// CarStanding is one row of the polled standings snapshot for the view.
#[derive(Debug, Clone)]
pub struct CarStanding {
    pub position: u32,
    pub car_no: u32,
    pub driver_initials: String,
    pub team_name: String,
    pub color: RgbColor,
    pub compl_laps: u32,
    pub cur_segment: usize,
    pub progress: f64,
    pub status: CarStatus,
}

/// RaceState owns the immutable race setup (track, teams, cars) and the mutable race-wide state
/// consumed concurrently by every worker and by the view: lifecycle status, simulation speed,
/// the race-finished flag, the ready counter of the start quorum, the append-only lap log, and
/// the append-only final classification.
///
/// The pause gate is a condition variable attached to the status: workers park in
/// wait_if_paused at their safe points and are woken by any status change.
#[derive(Debug)]
pub struct RaceState {
    pub track: Track,
    pub teams: Vec<Team>,
    pub cars_list: Vec<Arc<Car>>,
    tot_no_laps: AtomicU32,
    status: AtomicU8,
    sim_speed: AtomicU32,
    race_finished: AtomicBool,
    no_ready: AtomicUsize,
    t_race_start: Mutex<Option<Instant>>,
    laptime_log: Mutex<Vec<LapRecord>>,
    final_results: Mutex<Vec<ResultEntry>>,
    pause_lock: Mutex<()>,
    pause_gate: Condvar,
}

impl RaceState {
    pub fn new(
        track: Track,
        teams: Vec<Team>,
        cars_list: Vec<Arc<Car>>,
        tot_no_laps: u32,
    ) -> RaceState {
        RaceState {
            track,
            teams,
            cars_list,
            tot_no_laps: AtomicU32::new(tot_no_laps),
            status: AtomicU8::new(RaceStatus::Preparing.as_u8()),
            sim_speed: AtomicU32::new(1),
            race_finished: AtomicBool::new(false),
            no_ready: AtomicUsize::new(0),
            t_race_start: Mutex::new(None),
            laptime_log: Mutex::new(Vec::new()),
            final_results: Mutex::new(Vec::new()),
            pause_lock: Mutex::new(()),
            pause_gate: Condvar::new(),
        }
    }

    // STATUS AND PAUSE GATE -----------------------------------------------------------------------

    pub fn status(&self) -> RaceStatus {
        RaceStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// set_status publishes a new lifecycle state and wakes the pause gate, so that a resume (or
    /// an abort during a pause) is observed promptly.
    pub fn set_status(&self, status: RaceStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
        let _guard = self.pause_lock.lock().expect("Pause gate lock poisoned!");
        self.pause_gate.notify_all();
    }

    /// wait_if_paused parks the calling worker while the race is paused. Safe points call this
    /// between segments, between sub-steps and between polls.
    pub fn wait_if_paused(&self) {
        if self.status() != RaceStatus::Paused {
            return;
        }

        let mut guard = self.pause_lock.lock().expect("Pause gate lock poisoned!");
        while self.status() == RaceStatus::Paused {
            guard = self
                .pause_gate
                .wait(guard)
                .expect("Pause gate lock poisoned!");
        }
    }

    // SIMULATION SPEED ----------------------------------------------------------------------------

    pub fn sim_speed(&self) -> u32 {
        self.sim_speed.load(Ordering::SeqCst)
    }

    pub fn set_sim_speed(&self, sim_speed: u32) {
        self.sim_speed.store(sim_speed, Ordering::SeqCst);
    }

    /// scaled converts a millisecond value at 1x into a duration at the current simulation
    /// speed.
    pub fn scaled(&self, t_ms: u64) -> Duration {
        scale_millis(t_ms, self.sim_speed())
    }

    // LAP COUNT -----------------------------------------------------------------------------------

    pub fn tot_no_laps(&self) -> u32 {
        self.tot_no_laps.load(Ordering::SeqCst)
    }

    pub fn set_tot_no_laps(&self, tot_no_laps: u32) {
        self.tot_no_laps.store(tot_no_laps, Ordering::SeqCst);
    }

    // RACE END FAN-OUT ----------------------------------------------------------------------------

    pub fn is_race_finished(&self) -> bool {
        self.race_finished.load(Ordering::SeqCst)
    }

    pub fn raise_race_finished(&self) {
        self.race_finished.store(true, Ordering::SeqCst);
    }

    // START QUORUM --------------------------------------------------------------------------------

    /// report_ready counts a car worker that reached the grid; the director waits for a quorum
    /// before the light sequence.
    pub fn report_ready(&self) -> usize {
        self.no_ready.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn no_ready(&self) -> usize {
        self.no_ready.load(Ordering::SeqCst)
    }

    pub fn mark_start(&self) {
        let mut t_race_start = self
            .t_race_start
            .lock()
            .expect("Race start timestamp lock poisoned!");
        *t_race_start = Some(Instant::now());
    }

    pub fn t_race_start(&self) -> Option<Instant> {
        *self
            .t_race_start
            .lock()
            .expect("Race start timestamp lock poisoned!")
    }

    // APPEND-ONLY LOGS ----------------------------------------------------------------------------

    pub fn push_lap_record(&self, record: LapRecord) {
        self.laptime_log
            .lock()
            .expect("Lap log lock poisoned!")
            .push(record);
    }

    pub fn laptime_log(&self) -> Vec<LapRecord> {
        self.laptime_log
            .lock()
            .expect("Lap log lock poisoned!")
            .clone()
    }

    pub fn push_result(&self, entry: ResultEntry) {
        self.final_results
            .lock()
            .expect("Final results lock poisoned!")
            .push(entry);
    }

    pub fn final_results(&self) -> Vec<ResultEntry> {
        self.final_results
            .lock()
            .expect("Final results lock poisoned!")
            .clone()
    }

    // LIVE ORDERING -------------------------------------------------------------------------------

    /// get_live_order returns the car indices sorted by the live-ordering key (completed laps,
    /// segment id, progress, all descending). The keys are read without locking; the bounded
    /// staleness of a car mid-update is tolerated, and the result is a total order for any
    /// combination of concurrently read values.
    pub fn get_live_order(&self) -> Vec<usize> {
        let keys: Vec<(u32, usize, f64)> = self
            .cars_list
            .iter()
            .map(|car| car.ordering_key())
            .collect();

        argsort(&keys, SortOrder::Descending)
    }

    /// snapshot_standings renders the live order into view rows.
    pub fn snapshot_standings(&self) -> Vec<CarStanding> {
        self.get_live_order()
            .iter()
            .enumerate()
            .map(|(position, &car_idx)| {
                let car = &self.cars_list[car_idx];
                let team = &self.teams[car.team_id];

                CarStanding {
                    position: position as u32 + 1,
                    car_no: car.car_no,
                    driver_initials: car.driver.initials.to_owned(),
                    team_name: team.name.to_owned(),
                    color: team.color,
                    compl_laps: car.compl_laps(),
                    cur_segment: car.cur_segment(),
                    progress: car.progress(),
                    status: car.status(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{RaceState, RaceStatus};
    use crate::core::car::{Car, CarPars};
    use crate::core::driver::{Driver, DriverPars};
    use crate::core::team::{Team, TeamPars};
    use crate::core::tireset::Compound;
    use crate::core::track::{SegmentKind, SegmentPars, Track, TrackPars};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn segment_pars(kind: SegmentKind) -> SegmentPars {
        SegmentPars {
            kind,
            length: 300.0,
            t_base: None,
            capacity: None,
            overtaking_allowed: None,
        }
    }

    fn test_state(no_cars: u32) -> RaceState {
        let track_pars = TrackPars {
            name: "Test Ring".to_string(),
            segments: vec![
                segment_pars(SegmentKind::StartFinish),
                segment_pars(SegmentKind::Straight),
                segment_pars(SegmentKind::NormalTurn),
            ],
            pit_segments: vec![
                segment_pars(SegmentKind::PitEntry),
                segment_pars(SegmentKind::PitLane),
                segment_pars(SegmentKind::PitExit),
            ],
            pit_branch: 1,
            pit_rejoin: 2,
        };

        let team = Team::new(
            0,
            &TeamPars {
                name: "Test Team".to_string(),
                color: "#00d2be".to_string(),
                car_nos: [1, 2],
            },
        )
        .unwrap();

        let driver = Arc::new(Driver::new(&DriverPars {
            initials: "TST".to_string(),
            name: "Test Driver".to_string(),
            skill: 0.5,
        }));

        let cars_list: Vec<Arc<Car>> = (1..=no_cars)
            .map(|car_no| {
                Arc::new(Car::new(
                    &CarPars {
                        car_no,
                        team: "Test Team".to_string(),
                        driver_initials: "TST".to_string(),
                        start_compound: Compound::Medium,
                    },
                    0,
                    Arc::clone(&driver),
                ))
            })
            .collect();

        RaceState::new(Track::new(&track_pars, 100), vec![team], cars_list, 3)
    }

    #[test]
    fn live_order_sorts_by_laps_segment_progress() {
        let state = test_state(4);

        state.cars_list[0].close_lap(1000);
        state.cars_list[0].set_cur_segment(1);

        state.cars_list[1].close_lap(1000);
        state.cars_list[1].set_cur_segment(2);
        state.cars_list[1].set_progress(0.2);

        state.cars_list[2].close_lap(1000);
        state.cars_list[2].set_cur_segment(2);
        state.cars_list[2].set_progress(0.8);

        state.cars_list[3].set_cur_segment(2);
        state.cars_list[3].set_progress(0.9);

        assert_eq!(state.get_live_order(), vec![2, 1, 0, 3]);

        let standings = state.snapshot_standings();
        assert_eq!(standings[0].car_no, 3);
        assert_eq!(standings[0].position, 1);
        assert_eq!(standings[3].car_no, 4);
    }

    #[test]
    fn ordering_is_total_under_concurrent_mutation() {
        // readers compute the order from many threads while a writer keeps mutating the
        // published fields; the ordering must stay total and panic-free
        let state = Arc::new(test_state(6));
        let running = Arc::new(AtomicBool::new(true));

        let writer = {
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut step = 0usize;
                while running.load(Ordering::SeqCst) {
                    let car = &state.cars_list[step % 6];
                    car.set_cur_segment(step % 3);
                    car.set_progress((step % 10) as f64 / 10.0);
                    if step % 17 == 0 {
                        car.close_lap(1000);
                    }
                    step += 1;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let order = state.get_live_order();
                        assert_eq!(order.len(), 6);
                        let mut sorted = order.clone();
                        sorted.sort_unstable();
                        assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().unwrap();
        }
        running.store(false, Ordering::SeqCst);
        writer.join().unwrap();
    }

    #[test]
    fn pause_gate_blocks_and_releases_workers() {
        let state = Arc::new(test_state(1));
        state.set_status(RaceStatus::Paused);

        let t_start = Instant::now();
        let worker = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                state.wait_if_paused();
                t_start.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(150));
        state.set_status(RaceStatus::Running);

        let t_blocked = worker.join().unwrap();
        assert!(t_blocked >= Duration::from_millis(140));
    }

    #[test]
    fn scaled_divides_by_the_speed_factor() {
        let state = test_state(1);
        assert_eq!(state.scaled(1000), Duration::from_millis(1000));
        state.set_sim_speed(10);
        assert_eq!(state.scaled(1000), Duration::from_millis(100));
    }
}

use crate::core::car::{Car, CarStatus};
use crate::core::handle_race::RaceSync;
use crate::core::overtake::{OvertakeArbiter, OvertakeContext};
use crate::core::race::RaceState;
use crate::core::tireset::Tireset;
use crate::core::track::{Segment, SegmentKind};
use crate::interfaces::view_interface::EventSink;
use crate::post::race_result::{format_laptime, LapRecord};
use crate::pre::sim_config::SimConfig;
use crate::sync::Interrupted;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Number of sub-steps a segment traversal is divided into; the worker re-checks the shutdown
/// flags between sub-steps, so a stop request is observed within a tenth of a segment.
const NO_SUB_STEPS: u32 = 10;

/// Sub-step after which an overtake attempt is evaluated (mid-segment).
const OVERTAKE_SUB_STEP: u32 = 5;

/// grid_progress maps a grid position onto the starting progress within the start/finish
/// segment; pole sits closest to the line.
fn grid_progress(p_grid: u32, no_cars: usize) -> f64 {
    0.9 * (no_cars as f64 - (p_grid as f64 - 1.0)) / no_cars as f64
}

/// CarWorker drives one car around the ring. It owns the mutable tireset and the lap clock;
/// everything another thread reads is published through the atomic fields of the shared car
/// record. The worker holds at most one admission at a time and releases it before requesting
/// the next one.
pub struct CarWorker {
    race_state: Arc<RaceState>,
    car: Arc<Car>,
    sync: Arc<RaceSync>,
    config: SimConfig,
    events: EventSink,
    stop: Arc<AtomicBool>,
    tireset: Tireset,
    rng: StdRng,
    t_lap_start: Instant,
}

impl CarWorker {
    pub fn new(
        race_state: Arc<RaceState>,
        car: Arc<Car>,
        sync: Arc<RaceSync>,
        config: SimConfig,
        events: EventSink,
        stop: Arc<AtomicBool>,
        rng: StdRng,
    ) -> CarWorker {
        let tireset = Tireset::new(car.start_compound);

        CarWorker {
            race_state,
            car,
            sync,
            config,
            events,
            stop,
            tireset,
            rng,
            t_lap_start: Instant::now(),
        }
    }

    /// run is the thread body; it returns when the car finishes, the race ends, or the worker is
    /// interrupted inside a primitive during the shutdown fan-out.
    pub fn run(&mut self) {
        match self.drive() {
            Ok(()) => {}
            Err(Interrupted) => {
                log::debug!("car {}: interrupted during shutdown", self.car.car_no)
            }
        }
    }

    fn drive(&mut self) -> Result<(), Interrupted> {
        let no_cars = self.race_state.cars_list.len();
        let start_progress = grid_progress(self.car.p_grid(), no_cars);

        self.car.set_cur_segment(0);
        self.car.set_progress(start_progress);
        self.publish_tires();
        self.car.set_status(CarStatus::Grid);
        self.race_state.report_ready();

        self.sync.start_latch.await_release(self.car.car_no)?;
        self.car.set_status(CarStatus::Running);
        self.t_lap_start = Instant::now();

        let mut seg_id = 0usize;
        let mut from_progress = start_progress;

        loop {
            if self.should_stop() {
                return Ok(());
            }
            self.race_state.wait_if_paused();

            let stopped = self.traverse_segment(seg_id, from_progress)?;
            if stopped {
                return Ok(());
            }

            // choose the next segment deterministically: divert into the pit lane at the branch
            // if a stop was requested, close the lap when wrapping to the start/finish
            if self.race_state.track.is_pit_branch(seg_id) && self.car.has_pit_request() {
                let stopped = self.run_pit_sequence()?;
                if stopped {
                    return Ok(());
                }
                seg_id = self.race_state.track.pit_rejoin;
            } else {
                let next_id = self.race_state.track.next_main_id(seg_id);
                if next_id == 0 {
                    self.close_lap();
                    if self.car.is_finished() {
                        return Ok(());
                    }
                }
                seg_id = next_id;
            }

            from_progress = 0.0;
        }
    }

    // SEGMENT TRAVERSAL ---------------------------------------------------------------------------

    /// traverse_segment admits the car to the segment, runs the sub-steps and releases the
    /// admission again. Returns true if the worker observed a stop request mid-traversal.
    fn traverse_segment(&mut self, seg_id: usize, from_progress: f64) -> Result<bool, Interrupted> {
        let gated = self.sync.gates[seg_id].is_gated();

        if gated {
            if !self.sync.gates[seg_id].try_enter(self.car.car_no) {
                self.car.set_status(CarStatus::WaitingForSegment);
                self.sync.gates[seg_id].enter(self.car.car_no)?;
            }
            self.car.set_status(CarStatus::InCritical);
        }

        self.car.set_cur_segment(seg_id);
        if from_progress > 0.0 {
            self.car.set_progress(from_progress);
        }

        let stopped = self.run_sub_steps(seg_id, from_progress);

        if gated {
            self.sync.gates[seg_id].leave(self.car.car_no);
            self.car.set_status(CarStatus::Running);
        }

        if !stopped && !self.race_state.track.segment(seg_id).kind.is_pit() {
            self.tireset
                .drive_segment(self.race_state.track.no_main_segments);
            self.publish_tires();
        }

        Ok(stopped)
    }

    /// run_sub_steps sleeps through the subdivided traversal, publishing monotone progress and
    /// evaluating an overtake attempt mid-segment where overtaking is allowed.
    fn run_sub_steps(&mut self, seg_id: usize, from_progress: f64) -> bool {
        let segment = self.race_state.track.segment(seg_id).clone();
        let pace = self.car.driver.pace_factor() * self.tireset.speed_factor();
        let t_sub_ms = ((segment.t_base as f64 / pace / f64::from(NO_SUB_STEPS)) as u64).max(1);

        let mut step = (from_progress * f64::from(NO_SUB_STEPS)).round() as u32;

        while step < NO_SUB_STEPS {
            if self.should_stop() {
                return true;
            }
            self.race_state.wait_if_paused();

            thread::sleep(self.race_state.scaled(t_sub_ms));
            step += 1;
            self.car.set_progress(f64::from(step) / f64::from(NO_SUB_STEPS));

            if step == OVERTAKE_SUB_STEP && segment.overtaking_allowed {
                if let Some(new_progress) = self.attempt_overtake(&segment) {
                    // the successful move jumps past the defender; skip the covered sub-steps
                    self.car.set_progress(new_progress);
                    step = step.max((new_progress * f64::from(NO_SUB_STEPS)).floor() as u32);
                }
            }
        }

        false
    }

    // OVERTAKING ----------------------------------------------------------------------------------

    /// attempt_overtake looks for the closest car ahead in the same segment and rolls the
    /// arbiter if the time gap is below the threshold. Returns the new progress on success.
    fn attempt_overtake(&mut self, segment: &Segment) -> Option<f64> {
        let my_progress = self.car.progress();

        let mut defender_idx: Option<usize> = None;
        let mut defender_progress = f64::INFINITY;

        for (idx, other) in self.race_state.cars_list.iter().enumerate() {
            if other.car_no == self.car.car_no || other.is_finished() {
                continue;
            }
            if other.cur_segment() != segment.id {
                continue;
            }

            let other_progress = other.progress();
            if other_progress > my_progress && other_progress < defender_progress {
                defender_progress = other_progress;
                defender_idx = Some(idx);
            }
        }

        let defender = Arc::clone(&self.race_state.cars_list[defender_idx?]);

        // time gap estimated from the progress delta at the segment's base traversal time
        let gap_ms = (defender_progress - my_progress) * segment.t_base as f64;
        if gap_ms > self.config.overtake_gap_threshold_ms as f64 {
            return None;
        }

        self.car.set_status(CarStatus::InOvertakeZone);

        let context = OvertakeContext {
            overtaker_wear: self.tireset.wear,
            defender_wear: defender.tire_wear(),
            overtaker_speed_factor: self.tireset.speed_factor(),
            defender_speed_factor: defender.tire_speed_factor(),
            overtaker_skill: self.car.driver.skill,
            defender_skill: defender.driver.skill,
            drs_zone: segment.kind == SegmentKind::DrsZone,
            gap_ms,
        };
        let prob = OvertakeArbiter::calc_success_prob(&context);
        let success = self.sync.arbiter.attempt(prob, &mut self.rng);

        self.car.set_status(CarStatus::Running);

        if success {
            let new_progress =
                (defender.progress() + self.config.overtake_progress_bonus).min(0.99);
            self.events.log(format!(
                "Car {} overtakes car {} for position",
                self.car.car_no, defender.car_no
            ));
            Some(new_progress)
        } else {
            log::debug!(
                "car {}: overtake attempt on car {} failed",
                self.car.car_no,
                defender.car_no
            );
            None
        }
    }

    // LAP HANDLING --------------------------------------------------------------------------------

    fn close_lap(&mut self) {
        let t_lap = self.t_lap_start.elapsed().as_millis() as u64;
        self.t_lap_start = Instant::now();

        self.car.close_lap(t_lap);
        let compl_laps = self.car.compl_laps();

        self.race_state.push_lap_record(LapRecord {
            car_no: self.car.car_no,
            lap: compl_laps,
            t_lap,
            t_race: self.car.t_race(),
        });
        self.events.log(format!(
            "Car {} completed lap {} in {}",
            self.car.car_no,
            compl_laps,
            format_laptime(t_lap)
        ));

        if compl_laps >= self.race_state.tot_no_laps() {
            self.car.set_finished();
            self.car.set_status(CarStatus::Finished);
            self.events.log(format!(
                "Car {} takes the chequered flag after {} laps",
                self.car.car_no, compl_laps
            ));
        }
    }

    // PIT STOP ------------------------------------------------------------------------------------

    /// run_pit_sequence drives the detour: entry permit -> pit-entry segment -> box service ->
    /// exit permit -> pit-exit segment. The entry permit is released before the service so the
    /// entrance never blocks on a busy box.
    fn run_pit_sequence(&mut self) -> Result<bool, Interrupted> {
        let compound = match self.car.take_pit_request() {
            Some(compound) => compound,
            None => return Ok(false),
        };

        let track = &self.race_state.track;
        let (pit_entry_id, pit_lane_id, pit_exit_id) =
            (track.pit_entry_id, track.pit_lane_id, track.pit_exit_id);

        self.events
            .log(format!("Car {} enters the pit lane", self.car.car_no));

        self.car.set_status(CarStatus::WaitingForSegment);
        self.sync.pit_lane.acquire_entry(self.car.car_no)?;
        self.car.set_status(CarStatus::EnteringPit);

        let stopped = self.traverse_segment(pit_entry_id, 0.0)?;
        self.sync.pit_lane.release_entry(self.car.car_no);
        if stopped {
            return Ok(true);
        }

        let stopped = self.traverse_segment(pit_lane_id, 0.0)?;
        if stopped {
            return Ok(true);
        }

        self.car.set_status(CarStatus::InBox);
        let pit_box = &self.sync.boxes[self.car.team_id];
        pit_box.perform_stop(self.car.car_no, compound)?;

        // the crew is done: mount the fresh set and count the stop
        self.tireset = Tireset::new(compound);
        self.publish_tires();
        self.car.record_pitstop();
        self.events.log(format!(
            "Car {} leaves the box with {} tires (stop no {})",
            self.car.car_no,
            compound.short_name(),
            self.car.no_pitstops()
        ));

        self.car.set_status(CarStatus::LeavingPit);
        self.sync.pit_lane.acquire_exit(self.car.car_no)?;

        let stopped = self.traverse_segment(pit_exit_id, 0.0)?;
        self.sync.pit_lane.release_exit(self.car.car_no);
        if stopped {
            return Ok(true);
        }

        self.car.set_status(CarStatus::Running);
        Ok(false)
    }

    // HELPERS -------------------------------------------------------------------------------------

    fn publish_tires(&self) {
        self.car
            .publish_tires(self.tireset.compound, self.tireset.wear);
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.race_state.is_race_finished()
    }
}

use crate::core::handle_race::RaceSync;
use crate::core::race::{RaceState, RaceStatus};
use crate::interfaces::view_interface::{EventSink, ViewEvent};
use crate::post::race_result::ResultEntry;
use crate::pre::sim_config::SimConfig;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Number of start lights.
const NO_START_LIGHTS: u8 = 5;

/// Director is the singleton race-control worker: it gates the start behind the ready quorum and
/// the light sequence, supervises the running race at the view-update interval, detects the
/// first finisher, fans the race end out to all workers, and compiles the final classification.
pub struct Director {
    race_state: Arc<RaceState>,
    sync: Arc<RaceSync>,
    config: SimConfig,
    events: EventSink,
    stop: Arc<AtomicBool>,
    rng: StdRng,
}

impl Director {
    pub fn new(
        race_state: Arc<RaceState>,
        sync: Arc<RaceSync>,
        config: SimConfig,
        events: EventSink,
        stop: Arc<AtomicBool>,
        rng: StdRng,
    ) -> Director {
        Director {
            race_state,
            sync,
            config,
            events,
            stop,
            rng,
        }
    }

    pub fn run(&mut self) {
        if !self.run_start_sequence() {
            self.fan_out_race_end();
            return;
        }

        match self.supervise() {
            Some(winner_idx) => {
                self.events.log(format!(
                    "Car {} wins the race",
                    self.race_state.cars_list[winner_idx].car_no
                ));

                self.race_state.raise_race_finished();

                // settling period: workers observe the flag at their next safe point before the
                // primitives are torn down
                thread::sleep(self.race_state.scaled(2 * self.config.t_view_update_ms));
                self.sync.shutdown_all();

                self.race_state.set_status(RaceStatus::Finished);

                let results = self.compile_results();
                for entry in results.iter() {
                    self.race_state.push_result(entry.clone());
                }
                self.events.send(ViewEvent::RaceFinished(results));
            }
            None => self.fan_out_race_end(),
        }
    }

    // START SEQUENCE ------------------------------------------------------------------------------

    /// run_start_sequence waits for at least half of the field to report ready, runs the five
    /// lights and releases the latch after a randomized pause. Returns false if the race was
    /// stopped before the release.
    fn run_start_sequence(&mut self) -> bool {
        let quorum = (self.race_state.cars_list.len() + 1) / 2;

        while self.race_state.no_ready() < quorum {
            if self.should_abort() {
                return false;
            }
            thread::sleep(self.race_state.scaled(self.config.t_view_update_ms));
        }

        self.race_state.set_status(RaceStatus::StartPhase);
        self.events
            .log(format!("Start sequence begins on {}", self.race_state.track.name));

        for light in 1..=NO_START_LIGHTS {
            if self.should_abort() {
                return false;
            }
            thread::sleep(self.race_state.scaled(self.config.t_start_light_ms));
            self.events.send(ViewEvent::StartLight(light));
        }

        // anti-anticipation jitter between the last light and the release
        let t_jitter_ms = self
            .rng
            .gen_range(self.config.t_release_jitter_min_ms..=self.config.t_release_jitter_max_ms);
        thread::sleep(self.race_state.scaled(t_jitter_ms));

        if self.should_abort() {
            return false;
        }

        self.race_state.set_status(RaceStatus::Running);
        self.race_state.mark_start();
        self.sync.start_latch.release();
        self.events.send(ViewEvent::StartReleased);
        self.events.log(String::from("Lights out and away we go"));
        true
    }

    // SUPERVISION ---------------------------------------------------------------------------------

    /// supervise loops at the view-update interval until any car raises its finished flag and
    /// returns that car's index, or None if the race was aborted.
    fn supervise(&self) -> Option<usize> {
        loop {
            thread::sleep(self.race_state.scaled(self.config.t_view_update_ms));

            if self.should_abort() {
                return None;
            }
            self.race_state.wait_if_paused();

            self.events.send(ViewEvent::StandingsChanged);

            if let Some(winner_idx) = self
                .race_state
                .cars_list
                .iter()
                .position(|car| car.is_finished())
            {
                return Some(winner_idx);
            }
        }
    }

    /// fan_out_race_end raises the race-finished flag and tears the primitives down without a
    /// classification (abort path).
    fn fan_out_race_end(&self) {
        self.race_state.raise_race_finished();
        self.sync.shutdown_all();
    }

    // RESULTS -------------------------------------------------------------------------------------

    /// compile_results sorts the field by the live ordering and computes each car's delta to the
    /// leader from accumulated time.
    fn compile_results(&self) -> Vec<ResultEntry> {
        let order = self.race_state.get_live_order();
        let leader = &self.race_state.cars_list[order[0]];
        let t_leader = leader.t_race() as i64;

        order
            .iter()
            .enumerate()
            .map(|(position, &car_idx)| {
                let car = &self.race_state.cars_list[car_idx];

                ResultEntry {
                    position: position as u32 + 1,
                    car_no: car.car_no,
                    driver_initials: car.driver.initials.to_owned(),
                    team_name: self.race_state.teams[car.team_id].name.to_owned(),
                    no_laps: car.compl_laps(),
                    no_pitstops: car.no_pitstops(),
                    t_race: car.t_race(),
                    t_best_lap: car.t_best_lap(),
                    gap_to_leader: car.t_race() as i64 - t_leader,
                }
            })
            .collect()
    }

    fn should_abort(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.race_state.status() == RaceStatus::Aborted
    }
}

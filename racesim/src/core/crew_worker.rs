use crate::core::race::RaceState;
use crate::interfaces::view_interface::EventSink;
use crate::pre::sim_config::SimConfig;
use crate::sync::pit_box::PitBox;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Deadline for a single wait_for_car, so the crew gets a chance to observe a shutdown even if
/// no car ever comes in.
const T_SHUTDOWN_POLL_MS: u64 = 500;

/// CrewWorker services pit stops for one team. It consumes service requests from the team's pit
/// box one at a time: wait for a car, service it for a randomized duration (scaled by the
/// simulation speed), report completion.
pub struct CrewWorker {
    race_state: Arc<RaceState>,
    team_id: usize,
    pit_box: Arc<PitBox>,
    config: SimConfig,
    events: EventSink,
    stop: Arc<AtomicBool>,
    rng: StdRng,
}

impl CrewWorker {
    pub fn new(
        race_state: Arc<RaceState>,
        team_id: usize,
        pit_box: Arc<PitBox>,
        config: SimConfig,
        events: EventSink,
        stop: Arc<AtomicBool>,
        rng: StdRng,
    ) -> CrewWorker {
        CrewWorker {
            race_state,
            team_id,
            pit_box,
            config,
            events,
            stop,
            rng,
        }
    }

    pub fn run(&mut self) {
        loop {
            if self.should_stop() {
                return;
            }

            let request = match self
                .pit_box
                .wait_for_car(Some(self.race_state.scaled(T_SHUTDOWN_POLL_MS)))
            {
                Ok(request) => request,
                Err(_) => {
                    log::debug!("crew {}: interrupted during shutdown", self.team_id);
                    return;
                }
            };

            let (car_no, compound) = match request {
                Some(request) => request,
                // deadline passed without a car; loop back and re-check the shutdown flags
                None => continue,
            };

            let team_name = &self.race_state.teams[self.team_id].name;
            self.events.log(format!(
                "{} crew receives car {} for a {} stop",
                team_name,
                car_no,
                compound.short_name()
            ));

            let t_service_ms = self
                .rng
                .gen_range(self.config.t_pit_service_min_ms..=self.config.t_pit_service_max_ms);
            thread::sleep(self.race_state.scaled(t_service_ms));

            self.pit_box.finish_service();
            self.events.log(format!(
                "{} crew releases car {} after {:.1}s of service",
                team_name,
                car_no,
                t_service_ms as f64 / 1000.0
            ));
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.race_state.is_race_finished()
    }
}

use crate::core::car::{Car, CarStatus};
use crate::core::race::RaceState;
use crate::core::tireset::Compound;
use crate::interfaces::view_interface::EventSink;
use crate::pre::sim_config::SimConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Wear threshold above which the mandatory stop is taken early within its window.
const WEAR_OPPORTUNISTIC: f64 = 60.0;

/// pit_decision evaluates the stop rules for one car and returns the compound to request, or
/// None if no stop is due:
///
/// * mandatory stop: not yet performed and the current lap is inside the pit window; taken when
///   the hard deadline is reached (remaining laps at the window bound) or opportunistically once
///   the wear passed 60 percent
/// * critical wear: wear at or above the critical threshold with more than two laps remaining
///
/// The compound is picked by remaining laps: hard above 15, medium for 8..15, soft below 8.
pub fn pit_decision(
    mandatory_pit_done: bool,
    cur_lap: u32,
    tot_no_laps: u32,
    tire_wear: f64,
    config: &SimConfig,
) -> Option<Compound> {
    let remaining_laps = tot_no_laps.saturating_sub(cur_lap);
    let window_upper = tot_no_laps.saturating_sub(config.mandatory_pit_laps_before_end);

    let mandatory_due = !mandatory_pit_done
        && cur_lap >= config.mandatory_pit_earliest_lap
        && cur_lap <= window_upper
        && (remaining_laps <= config.mandatory_pit_laps_before_end
            || tire_wear >= WEAR_OPPORTUNISTIC);

    let critical_wear = tire_wear >= config.critical_tire_wear && remaining_laps > 2;

    if !(mandatory_due || critical_wear) {
        return None;
    }

    let compound = if remaining_laps > 15 {
        Compound::Hard
    } else if remaining_laps >= 8 {
        Compound::Medium
    } else {
        Compound::Soft
    };

    Some(compound)
}

/// Strategist watches both cars of one team and decides when to call them in. It polls on the
/// scaled strategist interval; the pit request on the car record is its only cross-thread write.
pub struct Strategist {
    race_state: Arc<RaceState>,
    team_id: usize,
    cars: Vec<Arc<Car>>,
    config: SimConfig,
    events: EventSink,
    stop: Arc<AtomicBool>,
}

impl Strategist {
    pub fn new(
        race_state: Arc<RaceState>,
        team_id: usize,
        cars: Vec<Arc<Car>>,
        config: SimConfig,
        events: EventSink,
        stop: Arc<AtomicBool>,
    ) -> Strategist {
        Strategist {
            race_state,
            team_id,
            cars,
            config,
            events,
            stop,
        }
    }

    pub fn run(&self) {
        loop {
            thread::sleep(
                self.race_state
                    .scaled(self.config.t_strategist_interval_ms),
            );

            if self.should_stop() {
                return;
            }
            self.race_state.wait_if_paused();

            for car in self.cars.iter() {
                self.evaluate_car(car);
            }
        }
    }

    fn evaluate_car(&self, car: &Arc<Car>) {
        // skip cars already in the pit queue, in the pit, or out of the race
        if car.is_finished() || car.has_pit_request() {
            return;
        }
        if matches!(
            car.status(),
            CarStatus::Grid
                | CarStatus::EnteringPit
                | CarStatus::InBox
                | CarStatus::LeavingPit
                | CarStatus::Finished
                | CarStatus::Retired
        ) {
            return;
        }

        let cur_lap = car.cur_lap();
        let tire_wear = car.tire_wear();

        if let Some(compound) = pit_decision(
            car.mandatory_pit_done(),
            cur_lap,
            self.race_state.tot_no_laps(),
            tire_wear,
            &self.config,
        ) {
            car.request_pitstop(compound);
            self.events.log(format!(
                "{} calls car {} in for {} tires (lap {}, wear {:.0} %)",
                self.race_state.teams[self.team_id].name,
                car.car_no,
                compound.short_name(),
                cur_lap,
                tire_wear
            ));
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.race_state.is_race_finished()
    }
}

use crate::core::track::SegmentKind;
use crate::pre::read_sim_pars::SimPars;
use crate::pre::sim_opts::SimOpts;
use anyhow::Context;
use helpers::general::InputValueError;

/// check_sim_opts_pars assures that the inserted options and parameters are within reasonable
/// limits and raises an error if not.
pub fn check_sim_opts_pars(sim_opts: &SimOpts, sim_pars: &SimPars) -> anyhow::Result<()> {
    // PART 1: SIMULATION OPTIONS
    if !matches!(sim_opts.sim_speed, 1 | 2 | 5 | 10) {
        return Err(InputValueError).context(format!(
            "sim_speed is {}, but must be one of 1, 2, 5 or 10!",
            sim_opts.sim_speed
        ));
    }

    if sim_opts.no_sim_runs < 1 {
        return Err(InputValueError).context(format!(
            "no_sim_runs must be at least equal to one, but is {}!",
            sim_opts.no_sim_runs
        ));
    }

    // PART 2: SIMULATION PARAMETERS
    // RACE ----------------------------------------------------------------------------------------
    let sim_config = &sim_pars.sim_config;
    let tot_no_laps = sim_opts
        .tot_no_laps
        .unwrap_or(sim_pars.race_pars.tot_no_laps);

    if !(sim_config.min_no_laps <= tot_no_laps && tot_no_laps <= sim_config.max_no_laps) {
        return Err(InputValueError).context(format!(
            "tot_no_laps is {}, which is not within the allowed range [{}, {}]!",
            tot_no_laps, sim_config.min_no_laps, sim_config.max_no_laps
        ));
    }

    if sim_pars.race_pars.participants.is_empty() {
        return Err(InputValueError).context("The participants list must not be empty!");
    }

    // TRACK ---------------------------------------------------------------------------------------
    let track_pars = &sim_pars.track_pars;

    if track_pars.segments.len() < 3 {
        return Err(InputValueError)
            .context("The main ring requires at least three segments!");
    }

    if track_pars.segments[0].kind != SegmentKind::StartFinish {
        return Err(InputValueError)
            .context("The first main segment must be the start/finish segment!");
    }

    if track_pars
        .segments
        .iter()
        .filter(|segment| segment.kind == SegmentKind::StartFinish)
        .count()
        != 1
    {
        return Err(InputValueError)
            .context("The main ring must contain exactly one start/finish segment!");
    }

    if track_pars
        .segments
        .iter()
        .any(|segment| segment.kind.is_pit())
    {
        return Err(InputValueError)
            .context("Pit segments must not appear in the main ring!");
    }

    let pit_kinds: Vec<SegmentKind> = track_pars
        .pit_segments
        .iter()
        .map(|segment| segment.kind)
        .collect();
    if pit_kinds != [SegmentKind::PitEntry, SegmentKind::PitLane, SegmentKind::PitExit] {
        return Err(InputValueError)
            .context("The pit segments must be exactly entry, lane, exit in driving order!");
    }

    if !(0 < track_pars.pit_branch
        && track_pars.pit_branch < track_pars.pit_rejoin
        && track_pars.pit_rejoin < track_pars.segments.len())
    {
        return Err(InputValueError).context(
            "The pit branch must lie before the pit rejoin and both must be within the main \
            ring (the detour must not cross the finish line)!",
        );
    }

    if track_pars.segments[0].capacity.is_some() {
        return Err(InputValueError)
            .context("The start/finish segment must not carry an admission capacity!");
    }

    // TIMING CONSTANTS ----------------------------------------------------------------------------
    if sim_config.t_pit_service_min_ms > sim_config.t_pit_service_max_ms {
        return Err(InputValueError)
            .context("t_pit_service_min_ms must not exceed t_pit_service_max_ms!");
    }

    if sim_config.t_release_jitter_min_ms > sim_config.t_release_jitter_max_ms {
        return Err(InputValueError)
            .context("t_release_jitter_min_ms must not exceed t_release_jitter_max_ms!");
    }

    if !(0.0 < sim_config.critical_tire_wear && sim_config.critical_tire_wear <= 100.0) {
        return Err(InputValueError).context(format!(
            "critical_tire_wear is {:.1}, which is not within the required range (0.0, 100.0]!",
            sim_config.critical_tire_wear
        ));
    }

    if sim_config.mandatory_pit_earliest_lap
        > tot_no_laps.saturating_sub(sim_config.mandatory_pit_laps_before_end)
    {
        return Err(InputValueError).context(format!(
            "The mandatory pit window [{}, {}] is empty for {} laps!",
            sim_config.mandatory_pit_earliest_lap,
            tot_no_laps.saturating_sub(sim_config.mandatory_pit_laps_before_end),
            tot_no_laps
        ));
    }

    // TEAMS, DRIVERS, CARS ------------------------------------------------------------------------
    for car_no in sim_pars.race_pars.participants.iter() {
        let car_pars = sim_pars.car_pars_all.get(car_no).ok_or(InputValueError).context(
            format!("Car parameters are missing for participant {}!", car_no),
        )?;

        if !sim_pars
            .team_pars_all
            .iter()
            .any(|team_pars| team_pars.name == car_pars.team)
        {
            return Err(InputValueError).context(format!(
                "Car {} references unknown team {}!",
                car_no, car_pars.team
            ));
        }

        if !sim_pars
            .driver_pars_all
            .contains_key(&car_pars.driver_initials)
        {
            return Err(InputValueError).context(format!(
                "Car {} references unknown driver initials {}!",
                car_no, car_pars.driver_initials
            ));
        }
    }

    for team_pars in sim_pars.team_pars_all.iter() {
        for car_no in team_pars.car_nos.iter() {
            if !sim_pars.race_pars.participants.contains(car_no) {
                return Err(InputValueError).context(format!(
                    "Team {} fields car {} which is not in the participants list!",
                    team_pars.name, car_no
                ));
            }
        }
    }

    for driver_pars in sim_pars.driver_pars_all.values() {
        if !(0.0 <= driver_pars.skill && driver_pars.skill <= 1.0) {
            return Err(InputValueError).context(format!(
                "Skill of driver {} is {:.2}, which is not within the required range \
                [0.0, 1.0]!",
                driver_pars.initials, driver_pars.skill
            ));
        }
    }

    Ok(())
}

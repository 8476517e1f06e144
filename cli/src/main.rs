use clap::Clap;
use racesim::core::handle_race::handle_race;
use racesim::interfaces::view_interface::ViewEvent;
use racesim::post::race_result::RaceResult;
use racesim::pre::check_sim_opts_pars::check_sim_opts_pars;
use racesim::pre::read_sim_pars::read_sim_pars;
use racesim::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::cmp::min;
use std::collections::HashMap;
use std::thread;
use std::time::Instant;

// set maximum number of concurrently running jobs in case of running more than a single
// simulation (every run spawns its own worker fleet of ~40 threads)
const MAX_NO_CONCURRENT_JOBS: u32 = 4;

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments and read simulation parameters
    let sim_opts: SimOpts = SimOpts::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if sim_opts.debug { "debug" } else { "warn" }),
    )
    .init();

    let mut sim_pars = read_sim_pars(sim_opts.parfile_path.as_path())?;

    if let Some(tot_no_laps) = sim_opts.tot_no_laps {
        sim_pars.race_pars.tot_no_laps = tot_no_laps;
    }

    // check simulation options and parameters
    check_sim_opts_pars(&sim_opts, &sim_pars)?;

    // print race details
    println!(
        "INFO: Simulating {} over {} laps with {} cars at {}x speed",
        sim_pars.track_pars.name,
        sim_pars.race_pars.tot_no_laps,
        sim_pars.race_pars.participants.len(),
        sim_opts.sim_speed
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if sim_opts.no_sim_runs == 1 {
        // LIVE CASE -------------------------------------------------------------------------------
        // create channel for communication between the race core and the console view
        let (tx, rx) = flume::unbounded();

        // console view: drain the event stream on a separate thread
        let printer = thread::spawn(move || {
            for event in rx.iter() {
                match event {
                    ViewEvent::Log(msg) => println!("INFO: {}", msg),
                    ViewEvent::StartLight(light) => println!("INFO: Start light {} on", light),
                    ViewEvent::StartReleased => println!("INFO: Start released"),
                    ViewEvent::RaceFinished(_) => println!("INFO: Race finished"),
                    // polling hint, nothing to print on a console
                    ViewEvent::StandingsChanged => {}
                }
            }
        });

        let t_start = Instant::now();
        let race_result = handle_race(&sim_pars, sim_opts.sim_speed, sim_opts.seed, Some(&tx))?;

        // closing the channel terminates the console view
        drop(tx);
        printer.join().expect("Console view thread panicked!");

        println!(
            "INFO: Execution time (total): {}ms",
            t_start.elapsed().as_millis()
        );

        // POST-PROCESSING -------------------------------------------------------------------------
        race_result.print_result();
        if sim_opts.debug {
            race_result.print_laptime_log();
        }
    } else {
        // BATCH CASE ------------------------------------------------------------------------------
        let t_start = Instant::now();
        let mut race_results: Vec<RaceResult> = Vec::with_capacity(sim_opts.no_sim_runs as usize);
        let mut no_races_left = sim_opts.no_sim_runs;
        let mut run_offset = 0u64;

        while no_races_left > 0 {
            // calculate number of simulation runs to execute in current loop
            let tmp_no_sim_runs = min(no_races_left, MAX_NO_CONCURRENT_JOBS);

            // simulate the races and save the results
            race_results.par_extend((0..tmp_no_sim_runs).into_par_iter().map(|run_idx| {
                let seed = sim_opts
                    .seed
                    .map(|seed| seed + run_offset + u64::from(run_idx));
                handle_race(&sim_pars, sim_opts.sim_speed, seed, None).unwrap()
            }));

            // reduce remaining simulation runs
            no_races_left -= tmp_no_sim_runs;
            run_offset += u64::from(tmp_no_sim_runs);
        }

        println!(
            "INFO: Execution time (total): {}ms",
            t_start.elapsed().as_millis()
        );

        // POST-PROCESSING -------------------------------------------------------------------------
        // tally the winners and the overtaking statistics over all runs
        let mut no_wins_per_driver: HashMap<String, u32> = HashMap::new();
        let mut no_attempts = 0u64;
        let mut no_successes = 0u64;

        for race_result in race_results.iter() {
            if let Some(winner) = race_result.entries.first() {
                *no_wins_per_driver
                    .entry(winner.driver_initials.to_owned())
                    .or_insert(0) += 1;
            }
            no_attempts += race_result.overtake_stats.attempts;
            no_successes += race_result.overtake_stats.successes;
        }

        println!("RESULT: Wins per driver over {} runs", sim_opts.no_sim_runs);
        let mut wins_sorted: Vec<(&String, &u32)> = no_wins_per_driver.iter().collect();
        wins_sorted.sort_by(|a, b| b.1.cmp(a.1));
        for (driver_initials, no_wins) in wins_sorted {
            println!("{}: {}", driver_initials, no_wins);
        }
        println!(
            "RESULT: {} overtaking attempts in total, {} successful",
            no_attempts, no_successes
        );
    }

    Ok(())
}

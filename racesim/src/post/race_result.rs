use crate::core::overtake::OvertakeStats;
use std::fmt::Write;

/// LapRecord is appended to the race-wide lap log whenever a car closes a lap.
#[derive(Debug, Clone)]
pub struct LapRecord {
    pub car_no: u32,
    pub lap: u32,
    pub t_lap: u64,
    pub t_race: u64,
}

/// ResultEntry is one row of the final classification.
#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub position: u32,
    pub car_no: u32,
    pub driver_initials: String,
    pub team_name: String,
    pub no_laps: u32,
    pub no_pitstops: u32,
    pub t_race: u64,
    pub t_best_lap: Option<u64>,
    /// Delta to the leader from accumulated time (ms); negative for cars that covered fewer
    /// laps and therefore accumulated less time.
    pub gap_to_leader: i64,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Clone)]
pub struct RaceResult {
    pub tot_no_laps: u32,
    pub entries: Vec<ResultEntry>,
    pub laptime_log: Vec<LapRecord>,
    pub overtake_stats: OvertakeStats,
}

/// format_laptime renders milliseconds as m:ss.mmm.
pub fn format_laptime(t_ms: u64) -> String {
    let minutes = t_ms / 60_000;
    let seconds = (t_ms % 60_000) / 1_000;
    let millis = t_ms % 1_000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

impl RaceResult {
    /// print_result prints the final classification to the console output.
    pub fn print_result(&self) {
        let mut tmp_string_result = String::new();

        writeln!(
            &mut tmp_string_result,
            "pos, car (driver), team, laps, stops, race time, best lap, gap"
        )
        .unwrap();

        for entry in self.entries.iter() {
            let leader_laps = self.entries[0].no_laps;

            let gap_string = if entry.position == 1 {
                String::from("-")
            } else if entry.no_laps < leader_laps {
                format!("+{} lap(s)", leader_laps - entry.no_laps)
            } else {
                format!("+{:.3}s", entry.gap_to_leader as f64 / 1000.0)
            };

            let best_lap_string = match entry.t_best_lap {
                Some(t_best) => format_laptime(t_best),
                None => String::from("-"),
            };

            writeln!(
                &mut tmp_string_result,
                "{:3}, {:3} ({}), {}, {:2}, {}, {}, {}, {}",
                entry.position,
                entry.car_no,
                entry.driver_initials,
                entry.team_name,
                entry.no_laps,
                entry.no_pitstops,
                format_laptime(entry.t_race),
                best_lap_string,
                gap_string
            )
            .unwrap();
        }

        println!("RESULT: Final classification");
        println!("{}", tmp_string_result);
        println!(
            "RESULT: Overtaking attempts: {} ({} successful, {} failed)",
            self.overtake_stats.attempts,
            self.overtake_stats.successes,
            self.overtake_stats.failures
        );
    }

    /// print_laptime_log prints all recorded laps in completion order.
    pub fn print_laptime_log(&self) {
        let mut tmp_string_laptimes = String::new();

        for record in self.laptime_log.iter() {
            writeln!(
                &mut tmp_string_laptimes,
                "{:3}, lap {:2}, {} (race time {})",
                record.car_no,
                record.lap,
                format_laptime(record.t_lap),
                format_laptime(record.t_race)
            )
            .unwrap();
        }

        println!("RESULT: Lap times");
        println!("{}", tmp_string_laptimes);
    }
}

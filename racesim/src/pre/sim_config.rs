use serde::Deserialize;

fn default_t_base_segment_ms() -> u64 {
    1300
}
fn default_t_pit_service_min_ms() -> u64 {
    2000
}
fn default_t_pit_service_max_ms() -> u64 {
    4000
}
fn default_t_view_update_ms() -> u64 {
    100
}
fn default_t_strategist_interval_ms() -> u64 {
    1000
}
fn default_critical_tire_wear() -> f64 {
    80.0
}
fn default_mandatory_pit_earliest_lap() -> u32 {
    8
}
fn default_mandatory_pit_laps_before_end() -> u32 {
    5
}
fn default_t_start_light_ms() -> u64 {
    1000
}
fn default_t_release_jitter_min_ms() -> u64 {
    500
}
fn default_t_release_jitter_max_ms() -> u64 {
    3000
}
fn default_overtake_gap_threshold_ms() -> u64 {
    1000
}
fn default_overtake_progress_bonus() -> f64 {
    0.05
}
fn default_min_no_laps() -> u32 {
    3
}
fn default_max_no_laps() -> u32 {
    70
}

/// SimConfig bundles the tunable constants of the live simulation. All time values are given in
/// milliseconds at 1x simulation speed and are divided by the speed factor at the point of use
/// (floored at 1ms). The parameter file may override any field; omitted fields fall back to the
/// defaults below.
#[derive(Debug, Deserialize, Clone)]
pub struct SimConfig {
    #[serde(default = "default_t_base_segment_ms")]
    pub t_base_segment_ms: u64,
    #[serde(default = "default_t_pit_service_min_ms")]
    pub t_pit_service_min_ms: u64,
    #[serde(default = "default_t_pit_service_max_ms")]
    pub t_pit_service_max_ms: u64,
    #[serde(default = "default_t_view_update_ms")]
    pub t_view_update_ms: u64,
    #[serde(default = "default_t_strategist_interval_ms")]
    pub t_strategist_interval_ms: u64,
    #[serde(default = "default_critical_tire_wear")]
    pub critical_tire_wear: f64,
    #[serde(default = "default_mandatory_pit_earliest_lap")]
    pub mandatory_pit_earliest_lap: u32,
    #[serde(default = "default_mandatory_pit_laps_before_end")]
    pub mandatory_pit_laps_before_end: u32,
    #[serde(default = "default_t_start_light_ms")]
    pub t_start_light_ms: u64,
    #[serde(default = "default_t_release_jitter_min_ms")]
    pub t_release_jitter_min_ms: u64,
    #[serde(default = "default_t_release_jitter_max_ms")]
    pub t_release_jitter_max_ms: u64,
    #[serde(default = "default_overtake_gap_threshold_ms")]
    pub overtake_gap_threshold_ms: u64,
    #[serde(default = "default_overtake_progress_bonus")]
    pub overtake_progress_bonus: f64,
    #[serde(default = "default_min_no_laps")]
    pub min_no_laps: u32,
    #[serde(default = "default_max_no_laps")]
    pub max_no_laps: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            t_base_segment_ms: default_t_base_segment_ms(),
            t_pit_service_min_ms: default_t_pit_service_min_ms(),
            t_pit_service_max_ms: default_t_pit_service_max_ms(),
            t_view_update_ms: default_t_view_update_ms(),
            t_strategist_interval_ms: default_t_strategist_interval_ms(),
            critical_tire_wear: default_critical_tire_wear(),
            mandatory_pit_earliest_lap: default_mandatory_pit_earliest_lap(),
            mandatory_pit_laps_before_end: default_mandatory_pit_laps_before_end(),
            t_start_light_ms: default_t_start_light_ms(),
            t_release_jitter_min_ms: default_t_release_jitter_min_ms(),
            t_release_jitter_max_ms: default_t_release_jitter_max_ms(),
            overtake_gap_threshold_ms: default_overtake_gap_threshold_ms(),
            overtake_progress_bonus: default_overtake_progress_bonus(),
            min_no_laps: default_min_no_laps(),
            max_no_laps: default_max_no_laps(),
        }
    }
}

use helpers::general::lin_interp;
use rand::Rng;
use std::sync::RwLock;

// weights of the probability model
const P_BASE: f64 = 0.30;
const W_TIRE_WEAR: f64 = 0.25;
const W_SPEED_FACTOR: f64 = 0.15;
const W_DRS_BONUS: f64 = 0.20;
const W_SLIPSTREAM: f64 = 0.15;
const W_DRIVER_SKILL: f64 = 0.10;
const W_DAMAGE: f64 = 0.15;
const P_MIN: f64 = 0.05;
const P_MAX: f64 = 0.85;

// slipstream fades linearly from full effect below 1s gap to none at 2s
const SLIPSTREAM_FULL_GAP_MS: f64 = 1000.0;
const SLIPSTREAM_ZERO_GAP_MS: f64 = 2000.0;

/// OvertakeStats aggregates the arbitration outcomes. attempts == successes + failures holds at
/// every quiescent point.
#[derive(Debug, Clone, Default)]
pub struct OvertakeStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

/// OvertakeArbiter decides overtaking maneuvers probabilistically. The aggregate counters live
/// behind a read/write lock: arbitration takes the exclusive lock, display readers take the
/// shared one.
#[derive(Debug, Default)]
pub struct OvertakeArbiter {
    stats: RwLock<OvertakeStats>,
}

/// OvertakeContext carries the published state of both cars that feeds the probability model.
#[derive(Debug, Clone, Copy)]
pub struct OvertakeContext {
    pub overtaker_wear: f64,
    pub defender_wear: f64,
    pub overtaker_speed_factor: f64,
    pub defender_speed_factor: f64,
    pub overtaker_skill: f64,
    pub defender_skill: f64,
    pub drs_zone: bool,
    pub gap_ms: f64,
}

impl OvertakeArbiter {
    pub fn new() -> OvertakeArbiter {
        Default::default()
    }

    /// calc_success_prob computes the success probability as a weighted sum of signed
    /// differences on top of the baseline, clamped to [0.05, 0.85]. The damage slot carries its
    /// weight but no signal until a damage model exists.
    pub fn calc_success_prob(context: &OvertakeContext) -> f64 {
        let mut prob = P_BASE;

        prob += W_TIRE_WEAR * (context.defender_wear - context.overtaker_wear) / 100.0;
        prob += W_SPEED_FACTOR * (context.overtaker_speed_factor - context.defender_speed_factor);

        if context.drs_zone {
            prob += W_DRS_BONUS;
        }

        prob += W_SLIPSTREAM
            * lin_interp(
                context.gap_ms,
                &[SLIPSTREAM_FULL_GAP_MS, SLIPSTREAM_ZERO_GAP_MS],
                &[1.0, 0.0],
            );
        prob += W_DRIVER_SKILL * (context.overtaker_skill - context.defender_skill);
        prob += W_DAMAGE * 0.0;

        prob.max(P_MIN).min(P_MAX)
    }

    /// attempt rolls the arbitration with the inserted probability and updates the aggregate
    /// counters under the exclusive lock.
    pub fn attempt(&self, prob: f64, rng: &mut impl Rng) -> bool {
        let success = rng.gen::<f64>() < prob;

        let mut stats = self.stats.write().expect("Overtake stats lock poisoned!");
        stats.attempts += 1;
        if success {
            stats.successes += 1;
        } else {
            stats.failures += 1;
        }

        success
    }

    /// stats returns a snapshot of the aggregate counters under the shared lock.
    pub fn stats(&self) -> OvertakeStats {
        self.stats
            .read()
            .expect("Overtake stats lock poisoned!")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{OvertakeArbiter, OvertakeContext};
    use approx::assert_ulps_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn neutral_context() -> OvertakeContext {
        OvertakeContext {
            overtaker_wear: 50.0,
            defender_wear: 50.0,
            overtaker_speed_factor: 1.0,
            defender_speed_factor: 1.0,
            overtaker_skill: 0.5,
            defender_skill: 0.5,
            drs_zone: false,
            gap_ms: 2000.0,
        }
    }

    #[test]
    fn neutral_attempt_keeps_the_baseline() {
        // equal cars, no DRS, gap at the slipstream fade-out -> plain baseline
        assert_ulps_eq!(
            OvertakeArbiter::calc_success_prob(&neutral_context()),
            0.30
        );
    }

    #[test]
    fn bonuses_add_up_as_weighted() {
        let context = OvertakeContext {
            defender_wear: 70.0,
            overtaker_wear: 50.0,
            drs_zone: true,
            gap_ms: 500.0,
            ..neutral_context()
        };

        // 0.30 + 0.25 * 0.2 + 0.20 + 0.15 * 1.0 = 0.75
        assert_ulps_eq!(OvertakeArbiter::calc_success_prob(&context), 0.75);
    }

    #[test]
    fn slipstream_fades_linearly() {
        let context = OvertakeContext {
            gap_ms: 1500.0,
            ..neutral_context()
        };

        assert_ulps_eq!(OvertakeArbiter::calc_success_prob(&context), 0.375);
    }

    #[test]
    fn probability_is_clamped() {
        let hopeless = OvertakeContext {
            overtaker_wear: 100.0,
            defender_wear: 0.0,
            overtaker_speed_factor: 0.8,
            defender_speed_factor: 1.06,
            overtaker_skill: 0.0,
            defender_skill: 1.0,
            ..neutral_context()
        };
        let dominant = OvertakeContext {
            overtaker_wear: 0.0,
            defender_wear: 100.0,
            overtaker_speed_factor: 1.06,
            defender_speed_factor: 0.8,
            overtaker_skill: 1.0,
            defender_skill: 0.0,
            drs_zone: true,
            gap_ms: 200.0,
            ..neutral_context()
        };

        assert_ulps_eq!(OvertakeArbiter::calc_success_prob(&hopeless), 0.05);
        assert_ulps_eq!(OvertakeArbiter::calc_success_prob(&dominant), 0.85);
    }

    #[test]
    fn stats_stay_consistent_under_concurrent_readers() {
        // 20 workers roll attempts while two readers poll; every observed snapshot must satisfy
        // attempts == successes + failures
        let arbiter = Arc::new(OvertakeArbiter::new());
        let running = Arc::new(AtomicBool::new(true));

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let arbiter = Arc::clone(&arbiter);
                let running = Arc::clone(&running);
                thread::spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        let stats = arbiter.stats();
                        assert_eq!(stats.attempts, stats.successes + stats.failures);
                        thread::sleep(Duration::from_millis(2));
                    }
                })
            })
            .collect();

        let workers: Vec<_> = (0..20u64)
            .map(|seed| {
                let arbiter = Arc::clone(&arbiter);
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for _ in 0..50 {
                        arbiter.attempt(0.5, &mut rng);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        running.store(false, Ordering::SeqCst);
        for reader in readers {
            reader.join().unwrap();
        }

        let stats = arbiter.stats();
        assert_eq!(stats.attempts, 1000);
        assert_eq!(stats.attempts, stats.successes + stats.failures);
    }
}

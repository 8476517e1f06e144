use serde::Deserialize;

/// Compound covers the three dry tire compounds. Each compound trades base speed against wear:
/// soft is fastest and degrades quickest, hard is slowest and lasts longest.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
}

impl Compound {
    /// base_speed_factor returns the pace multiplier of a fresh set (greater than 1.0 is faster
    /// than the reference traversal time).
    pub fn base_speed_factor(self) -> f64 {
        match self {
            Compound::Soft => 1.06,
            Compound::Medium => 1.03,
            Compound::Hard => 1.00,
        }
    }

    /// wear_per_lap returns the wear increase in percent per racing lap.
    pub fn wear_per_lap(self) -> f64 {
        match self {
            Compound::Soft => 3.6,
            Compound::Medium => 2.4,
            Compound::Hard => 1.6,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Compound::Soft => "S",
            Compound::Medium => "M",
            Compound::Hard => "H",
        }
    }

    /// as_u8/from_u8 map the compound onto an integer for atomic publication of the mounted set.
    pub fn as_u8(self) -> u8 {
        match self {
            Compound::Soft => 0,
            Compound::Medium => 1,
            Compound::Hard => 2,
        }
    }

    pub fn from_u8(id: u8) -> Compound {
        match id {
            0 => Compound::Soft,
            1 => Compound::Medium,
            2 => Compound::Hard,
            _ => panic!("Unknown compound id {}!", id),
        }
    }
}

/// Tireset tracks the mounted compound and its accumulated wear. Wear is strictly non-decreasing
/// between pit stops; a compound swap only happens via a pit stop, where the car worker mounts a
/// fresh set after the crew has finished.
#[derive(Debug, Clone)]
pub struct Tireset {
    pub compound: Compound,
    pub wear: f64, // [0.0, 100.0] percent
}

impl Tireset {
    pub fn new(compound: Compound) -> Tireset {
        Tireset {
            compound,
            wear: 0.0,
        }
    }

    /// drive_segment adds the per-segment share of the compound's per-lap wear rate, saturating
    /// at 100 percent.
    pub fn drive_segment(&mut self, no_main_segments: usize) {
        let wear_step = self.compound.wear_per_lap() / no_main_segments as f64;
        self.wear = (self.wear + wear_step).min(100.0);
    }

    /// speed_factor returns the current pace multiplier: the fresh-set factor with a linear
    /// falloff to 80 percent of its value at full wear.
    pub fn speed_factor(&self) -> f64 {
        self.compound.base_speed_factor() * (1.0 - 0.2 * self.wear / 100.0)
    }
}

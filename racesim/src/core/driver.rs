use serde::Deserialize;

/// * `initials` - Driver initials, e.g. BOT
/// * `name` - Driver name, e.g. Valtteri Bottas
/// * `skill` - Driver skill in [0.0, 1.0]; feeds the base pace and the overtake weighting
#[derive(Debug, Deserialize, Clone)]
pub struct DriverPars {
    pub initials: String,
    pub name: String,
    pub skill: f64,
}

#[derive(Debug)]
pub struct Driver {
    pub initials: String,
    pub name: String,
    pub skill: f64,
}

impl Driver {
    pub fn new(driver_pars: &DriverPars) -> Driver {
        Driver {
            initials: driver_pars.initials.to_owned(),
            name: driver_pars.name.to_owned(),
            skill: driver_pars.skill,
        }
    }

    /// pace_factor maps the skill onto a pace multiplier around 1.0 (+-2.5 percent).
    pub fn pace_factor(&self) -> f64 {
        0.975 + 0.05 * self.skill
    }
}

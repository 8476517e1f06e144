use crate::interfaces::view_interface::RgbColor;
use anyhow::Context;
use serde::Deserialize;

/// * `name` - Team name
/// * `color` - Team color as a hex string, e.g. "#00d2be"
/// * `car_nos` - The two car numbers fielded by the team
#[derive(Debug, Deserialize, Clone)]
pub struct TeamPars {
    pub name: String,
    pub color: String,
    pub car_nos: [u32; 2],
}

/// Team is the immutable team record; every team owns one pit box and one crew.
#[derive(Debug)]
pub struct Team {
    pub team_id: usize,
    pub name: String,
    pub color: RgbColor,
    pub car_nos: [u32; 2],
}

impl Team {
    pub fn new(team_id: usize, team_pars: &TeamPars) -> anyhow::Result<Team> {
        // convert hex color to a rgb color
        let tmp_color = team_pars
            .color
            .parse::<css_color_parser::Color>()
            .context("Could not parse hex color!")?;

        Ok(Team {
            team_id,
            name: team_pars.name.to_owned(),
            color: RgbColor {
                r: tmp_color.r,
                g: tmp_color.g,
                b: tmp_color.b,
            },
            car_nos: team_pars.car_nos,
        })
    }
}

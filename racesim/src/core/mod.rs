pub mod car;
pub mod car_worker;
pub mod crew_worker;
pub mod director;
pub mod driver;
pub mod handle_race;
pub mod overtake;
pub mod race;
pub mod strategist;
pub mod team;
pub mod tireset;
pub mod track;

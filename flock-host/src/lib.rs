//! Reference host for flock-core: spawns leaders and followers, drives the
//! leaders along scripted orbits and streams every report as a JSON line.

pub mod scenario;
pub mod settings;

pub use scenario::{RunOptions, RunSummary, Scenario, CAPACITY};
pub use settings::HostSettings;

#![cfg_attr(not(feature = "std"), no_std)]

//! Serializable settings and reports exchanged between flock-core and its
//! host.

extern crate alloc;

mod settings;
mod snapshot;

pub use settings::{FollowerSettings, SettingsError, SteeringSettings};
pub use snapshot::{AgentSnapshot, TickReport};

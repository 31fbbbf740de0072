#![cfg_attr(not(feature = "std"), no_std)]

//! Leader-following boids.
//!
//! Each agent steers with the classic cohesion, separation and alignment
//! rules towards the other followers of its leader, plus a pull towards
//! the leader itself. [`Simulation`] owns the agents and the leader
//! back-references and advances them in snapshot ticks.

pub mod agent;
pub mod error;
pub mod leader;
pub mod simulation;
pub mod steering;

pub use agent::{Agent, AgentConfig, AgentId, LeaderLock};
pub use error::FlockError;
pub use glam::{Quat, Vec3};
pub use leader::{FollowerSet, LeaderChange, LeaderRegistry};
pub use simulation::{Simulation, SimulationConfig};
pub use steering::{SteeringFactors, SteeringTerms};

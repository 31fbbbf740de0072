use core::fmt;

use glam::{Quat, Vec3};

/// Stable handle for an agent inside a [`Simulation`](crate::Simulation).
///
/// Ids are handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(u32);

impl AgentId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-agent tuning, fixed when the agent is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    /// Seconds an agent stays locked to a leader after switching to it
    pub leader_change_cooldown: f32,
    pub max_speed: f32,
    /// Distance at which two agents consider themselves overly crowded
    pub crowded_distance: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            leader_change_cooldown: 2.0,
            max_speed: 10.0,
            crowded_distance: 2.0,
        }
    }
}

/// Whether an agent currently accepts a new leader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeaderLock {
    Free,
    Locked { remaining: f32 },
}

/// A single steered agent
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    config: AgentConfig,
    leader: Option<AgentId>,
    change_timer: f32,
}

impl Agent {
    pub fn new(id: AgentId, config: AgentConfig, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            position,
            velocity,
            orientation: Quat::IDENTITY,
            config,
            leader: None,
            change_timer: 0.0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn max_speed(&self) -> f32 {
        self.config.max_speed
    }

    pub fn crowded_distance(&self) -> f32 {
        self.config.crowded_distance
    }

    pub fn leader(&self) -> Option<AgentId> {
        self.leader
    }

    pub fn change_timer(&self) -> f32 {
        self.change_timer
    }

    pub fn lock(&self) -> LeaderLock {
        if self.change_timer > 0.0 {
            LeaderLock::Locked {
                remaining: self.change_timer,
            }
        } else {
            LeaderLock::Free
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.lock(), LeaderLock::Locked { .. })
    }

    /// Counts the leader-change timer down towards zero.
    pub fn decay_timer(&mut self, dt: f32) {
        self.change_timer = (self.change_timer - dt).max(0.0);
    }

    /// Assigns a leader without touching the cooldown.
    pub(crate) fn assign_leader(&mut self, leader: Option<AgentId>) {
        self.leader = leader;
    }

    /// Assigns a leader and arms the cooldown.
    pub(crate) fn switch_leader(&mut self, leader: AgentId) {
        self.leader = Some(leader);
        self.change_timer = self.config.leader_change_cooldown;
    }
}

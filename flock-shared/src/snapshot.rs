use alloc::vec::Vec;

use flock_core::{Agent, Vec3};
use serde::{Deserialize, Serialize};

/// Wire view of one agent at the end of a tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub id: u32,
    /// `None` for anchors that follow nobody
    pub leader: Option<u32>,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    /// Quaternion as `[x, y, z, w]`
    pub orientation: [f32; 4],
    pub change_timer: f32,
}

impl AgentSnapshot {
    pub fn speed(&self) -> f32 {
        Vec3::from_array(self.velocity).length()
    }
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id().raw(),
            leader: agent.leader().map(|leader| leader.raw()),
            position: agent.position.to_array(),
            velocity: agent.velocity.to_array(),
            orientation: agent.orientation.to_array(),
            change_timer: agent.change_timer(),
        }
    }
}

/// State of the whole simulation after a tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Simulated seconds
    pub elapsed: f32,
    pub agents: Vec<AgentSnapshot>,
}

impl TickReport {
    pub fn capture<'a, I>(tick: u64, elapsed: f32, agents: I) -> Self
    where
        I: IntoIterator<Item = &'a Agent>,
    {
        Self {
            tick,
            elapsed,
            agents: agents.into_iter().map(AgentSnapshot::from).collect(),
        }
    }

    #[cfg(feature = "std")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[cfg(feature = "std")]
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

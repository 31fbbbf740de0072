use crate::agent::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlockError {
    #[error("no agent with id {0}")]
    UnknownAgent(AgentId),
    #[error("leader {0} is not part of the simulation")]
    UnknownLeader(AgentId),
    #[error("agent {0} cannot lead itself")]
    SelfLeadership(AgentId),
    #[error("capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
}

//! Leader back-references.
//!
//! Followers own their leader reference; the registry only mirrors it so
//! a leader can enumerate its flock. Sets are changed through
//! [`LeaderRegistry::request_change`], spawning and removal.

use heapless::LinearMap;

use crate::agent::{Agent, AgentId, LeaderLock};
use crate::error::FlockError;

/// Outcome of a leader-change request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeaderChange {
    /// The agent now follows the requested leader.
    Changed { previous: Option<AgentId> },
    /// The agent was still locked; nothing happened.
    Ignored { remaining: f32 },
}

/// Ids of the agents following one leader, without duplicates
#[derive(Debug, Clone, Default)]
pub struct FollowerSet<const N: usize> {
    members: heapless::Vec<AgentId, N>,
}

impl<const N: usize> FollowerSet<N> {
    pub fn new() -> Self {
        Self {
            members: heapless::Vec::new(),
        }
    }

    /// Returns `Ok(false)` if the id was already a member.
    pub fn insert(&mut self, id: AgentId) -> Result<bool, FlockError> {
        if self.contains(id) {
            return Ok(false);
        }
        self.members
            .push(id)
            .map_err(|_| FlockError::CapacityExceeded { capacity: N })?;
        Ok(true)
    }

    pub fn remove(&mut self, id: AgentId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != id);
        self.members.len() != before
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.members.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentId> + Clone + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LeaderRegistry<const N: usize> {
    sets: LinearMap<AgentId, FollowerSet<N>, N>,
}

impl<const N: usize> Default for LeaderRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LeaderRegistry<N> {
    pub fn new() -> Self {
        Self {
            sets: LinearMap::new(),
        }
    }

    pub fn followers(&self, leader: AgentId) -> Option<&FollowerSet<N>> {
        self.sets.get(&leader)
    }

    pub fn is_following(&self, follower: AgentId, leader: AgentId) -> bool {
        self.followers(leader).is_some_and(|set| set.contains(follower))
    }

    /// Number of leaders with at least one follower
    pub fn leader_count(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn enroll(&mut self, follower: AgentId, leader: AgentId) -> Result<(), FlockError> {
        if let Some(set) = self.sets.get_mut(&leader) {
            set.insert(follower)?;
            return Ok(());
        }

        let mut set = FollowerSet::new();
        set.insert(follower)?;
        self.sets
            .insert(leader, set)
            .map_err(|_| FlockError::CapacityExceeded { capacity: N })?;
        Ok(())
    }

    pub(crate) fn withdraw(&mut self, follower: AgentId, leader: AgentId) -> bool {
        let Some(set) = self.sets.get_mut(&leader) else {
            return false;
        };
        let removed = set.remove(follower);
        if set.is_empty() {
            self.sets.remove(&leader);
        }
        removed
    }

    /// Drops the follower set of a leader that is going away.
    pub(crate) fn disband(&mut self, leader: AgentId) -> Option<FollowerSet<N>> {
        self.sets.remove(&leader)
    }

    /// Moves `agent` to `new_leader` unless its cooldown is still running.
    ///
    /// The caller is responsible for `new_leader` naming a live agent.
    pub fn request_change(
        &mut self,
        agent: &mut Agent,
        new_leader: AgentId,
    ) -> Result<LeaderChange, FlockError> {
        if agent.id() == new_leader {
            return Err(FlockError::SelfLeadership(new_leader));
        }

        if let LeaderLock::Locked { remaining } = agent.lock() {
            log::trace!(
                "agent {} locked for {:.2}s, ignoring switch to {}",
                agent.id(),
                remaining,
                new_leader
            );
            return Ok(LeaderChange::Ignored { remaining });
        }

        let previous = agent.leader();
        if previous != Some(new_leader) {
            self.enroll(agent.id(), new_leader)?;
            if let Some(old) = previous {
                self.withdraw(agent.id(), old);
            }
        }
        agent.switch_leader(new_leader);

        log::debug!(
            "agent {} now follows {} (was {:?})",
            agent.id(),
            new_leader,
            previous
        );
        Ok(LeaderChange::Changed { previous })
    }
}

use glam::Vec3;

use crate::agent::{Agent, AgentConfig, AgentId};
use crate::error::FlockError;
use crate::leader::{FollowerSet, LeaderChange, LeaderRegistry};
use crate::steering::{self, SteeringFactors};

/// Configuration shared by every agent of a simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub factors: SteeringFactors,
    /// Fraction of the remaining turn applied to the orientation each tick
    pub orientation_blend: f32,
    /// Advance positions by `velocity * dt`. Hosts with their own physics
    /// turn this off and write positions back with [`Simulation::set_position`].
    pub integrate_positions: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            factors: SteeringFactors::default(),
            orientation_blend: 0.2,
            integrate_positions: true,
        }
    }
}

/// A fixed-capacity set of agents and their leaders
pub struct Simulation<const N: usize> {
    /// Sorted by id: ids only grow and removal keeps the order.
    agents: heapless::Vec<Agent, N>,
    leaders: LeaderRegistry<N>,
    config: SimulationConfig,
    next_id: u32,
    ticks: u64,
    elapsed: f32,
}

impl<const N: usize> Simulation<N> {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            agents: heapless::Vec::new(),
            leaders: LeaderRegistry::new(),
            config,
            next_id: 0,
            ticks: 0,
            elapsed: 0.0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Adds an agent, optionally already following `leader`.
    ///
    /// The initial assignment does not start the leader-change cooldown.
    pub fn spawn(
        &mut self,
        config: AgentConfig,
        position: Vec3,
        velocity: Vec3,
        leader: Option<AgentId>,
    ) -> Result<AgentId, FlockError> {
        if self.agents.is_full() {
            return Err(FlockError::CapacityExceeded { capacity: N });
        }
        if let Some(leader) = leader {
            if self.index_of(leader).is_none() {
                return Err(FlockError::UnknownLeader(leader));
            }
        }

        let id = AgentId::new(self.next_id);
        let mut agent = Agent::new(id, config, position, velocity);
        if let Some(leader) = leader {
            self.leaders.enroll(id, leader)?;
            agent.assign_leader(Some(leader));
        }
        if let Err(agent) = self.agents.push(agent) {
            if let Some(leader) = agent.leader() {
                self.leaders.withdraw(id, leader);
            }
            return Err(FlockError::CapacityExceeded { capacity: N });
        }
        self.next_id += 1;

        log::debug!("spawned agent {} following {:?}", id, leader);
        Ok(id)
    }

    /// Takes an agent out of the simulation and out of its leader's flock.
    ///
    /// Followers of a removed leader are left without a leader.
    pub fn remove(&mut self, id: AgentId) -> Result<Agent, FlockError> {
        let index = self.index_of(id).ok_or(FlockError::UnknownAgent(id))?;
        let agent = self.agents.remove(index);

        if let Some(leader) = agent.leader() {
            self.leaders.withdraw(id, leader);
        }

        if let Some(orphans) = self.leaders.disband(id) {
            log::warn!(
                "removed leader {} left {} followers without a leader",
                id,
                orphans.len()
            );
            for orphan in orphans.iter() {
                if let Ok(follower) = self.agent_mut(orphan) {
                    follower.assign_leader(None);
                }
            }
        }

        log::debug!("removed agent {}", id);
        Ok(agent)
    }

    /// Asks `id` to follow `leader`; ignored while its cooldown runs.
    pub fn request_leader_change(
        &mut self,
        id: AgentId,
        leader: AgentId,
    ) -> Result<LeaderChange, FlockError> {
        if self.index_of(leader).is_none() {
            return Err(FlockError::UnknownLeader(leader));
        }
        let index = self.index_of(id).ok_or(FlockError::UnknownAgent(id))?;
        let agent = &mut self.agents[index];

        self.leaders.request_change(agent, leader)
    }

    /// Advances every agent by one tick of `dt` seconds.
    ///
    /// All deltas are computed from the state at the start of the tick
    /// before any agent is updated.
    pub fn tick(&mut self, dt: f32) {
        let mut deltas = heapless::Vec::<Vec3, N>::new();

        for agent in self.agents.iter() {
            let _ = deltas.push(self.delta_for(agent));
        }

        let blend = self.config.orientation_blend;
        let integrate = self.config.integrate_positions;
        for (agent, delta) in self.agents.iter_mut().zip(deltas.iter()) {
            steering::apply_tick(agent, *delta, blend);
            if integrate {
                agent.position += agent.velocity * dt;
            }
            agent.decay_timer(dt);
        }

        self.ticks += 1;
        self.elapsed += dt;
        log::trace!("tick {} ({} agents, dt {})", self.ticks, self.agents.len(), dt);
    }

    fn delta_for(&self, agent: &Agent) -> Vec3 {
        let Some(leader) = agent.leader().and_then(|id| self.agent(id)) else {
            return Vec3::ZERO;
        };

        // resolve each mate once; every rule walks the same list
        let mates: heapless::Vec<&Agent, N> = self.flockmates_of(agent).collect();

        steering::velocity_delta(
            agent,
            mates.iter().copied(),
            leader.position,
            &self.config.factors,
        )
    }

    fn flockmates_of<'a>(
        &'a self,
        agent: &Agent,
    ) -> impl Iterator<Item = &'a Agent> + Clone + 'a {
        let own_id = agent.id();
        agent
            .leader()
            .and_then(|leader| self.leaders.followers(leader))
            .into_iter()
            .flat_map(|set| set.iter())
            .filter(move |id| *id != own_id)
            .filter_map(move |id| self.agent(id))
    }

    /// The other members of `id`'s flock.
    pub fn flockmates(
        &self,
        id: AgentId,
    ) -> Result<impl Iterator<Item = &Agent> + Clone + '_, FlockError> {
        let agent = self.agent(id).ok_or(FlockError::UnknownAgent(id))?;
        Ok(self.flockmates_of(agent))
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.index_of(id).map(|index| &self.agents[index])
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn followers(&self, leader: AgentId) -> Option<&FollowerSet<N>> {
        self.leaders.followers(leader)
    }

    pub fn leader_of(&self, id: AgentId) -> Result<Option<AgentId>, FlockError> {
        self.agent(id)
            .map(Agent::leader)
            .ok_or(FlockError::UnknownAgent(id))
    }

    pub fn set_velocity(&mut self, id: AgentId, velocity: Vec3) -> Result<(), FlockError> {
        self.agent_mut(id)?.velocity = velocity;
        Ok(())
    }

    pub fn set_position(&mut self, id: AgentId, position: Vec3) -> Result<(), FlockError> {
        self.agent_mut(id)?.position = position;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds since creation
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, FlockError> {
        let index = self.index_of(id).ok_or(FlockError::UnknownAgent(id))?;
        Ok(&mut self.agents[index])
    }

    fn index_of(&self, id: AgentId) -> Option<usize> {
        self.agents.binary_search_by_key(&id, Agent::id).ok()
    }
}

impl<const N: usize> Default for Simulation<N> {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

use std::f32::consts::TAU;
use std::io::Write;

use anyhow::{ensure, Context, Result};
use flock_core::{AgentConfig, AgentId, LeaderChange, Simulation, Vec3};
use flock_shared::TickReport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::settings::HostSettings;

/// Maximum number of agents (leaders plus followers) in one run
pub const CAPACITY: usize = 128;

/// Shape of a run, usually filled from the command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub leaders: usize,
    pub followers: usize,
    pub ticks: u64,
    /// Seconds per tick
    pub dt: f32,
    /// Ask every follower to switch to its nearest leader this often (0 = never)
    pub reelect_every: u64,
    /// Emit a report this often (0 = only totals)
    pub report_every: u64,
    pub seed: u64,
    pub orbit_radius: f32,
    /// Seconds for a leader to complete one orbit
    pub orbit_period: f32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            leaders: 3,
            followers: 30,
            ticks: 600,
            dt: 1.0 / 60.0,
            reelect_every: 60,
            report_every: 10,
            seed: 7,
            orbit_radius: 40.0,
            orbit_period: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub reports: u64,
    pub leader_changes: u64,
    /// Requests dropped because the follower was still in its cooldown
    pub ignored_requests: u64,
}

/// Leaders orbiting the origin with flocks chasing them
pub struct Scenario {
    sim: Box<Simulation<CAPACITY>>,
    leaders: Vec<AgentId>,
    followers: Vec<AgentId>,
    options: RunOptions,
    summary: RunSummary,
}

impl Scenario {
    pub fn new(options: RunOptions, settings: &HostSettings) -> Result<Self> {
        ensure!(options.leaders > 0, "At least one leader is required");
        ensure!(
            options.leaders + options.followers <= CAPACITY,
            "{} leaders and {} followers exceed the capacity of {}",
            options.leaders,
            options.followers,
            CAPACITY
        );
        ensure!(
            options.dt.is_finite() && options.dt > 0.0,
            "Tick length must be positive (got {})",
            options.dt
        );
        ensure!(
            options.orbit_period.is_finite() && options.orbit_period > 0.0,
            "Orbit period must be positive (got {})",
            options.orbit_period
        );
        settings.validate()?;

        let mut sim: Box<Simulation<CAPACITY>> =
            Box::new(Simulation::new(settings.steering.into()));
        let agent_config = AgentConfig::from(settings.follower);
        let mut rng = StdRng::seed_from_u64(options.seed);

        let mut leaders = Vec::with_capacity(options.leaders);
        for index in 0..options.leaders {
            let (position, velocity) = orbit(&options, index, 0.0);
            let id = sim
                .spawn(agent_config, position, velocity, None)
                .context("Failed to spawn leader")?;
            leaders.push(id);
        }

        let spread = options.orbit_radius * 0.25;
        let mut followers = Vec::with_capacity(options.followers);
        for index in 0..options.followers {
            let leader = leaders[index % leaders.len()];
            let anchor = sim.agent(leader).map_or(Vec3::ZERO, |agent| agent.position);
            let position = anchor + random_vector(&mut rng, spread);
            let velocity = random_vector(&mut rng, 1.0);
            let id = sim
                .spawn(agent_config, position, velocity, Some(leader))
                .context("Failed to spawn follower")?;
            followers.push(id);
        }

        log::info!(
            "Spawned {} leaders and {} followers (seed {})",
            leaders.len(),
            followers.len(),
            options.seed
        );

        Ok(Self {
            sim,
            leaders,
            followers,
            options,
            summary: RunSummary::default(),
        })
    }

    pub fn simulation(&self) -> &Simulation<CAPACITY> {
        &self.sim
    }

    pub fn leaders(&self) -> &[AgentId] {
        &self.leaders
    }

    pub fn followers(&self) -> &[AgentId] {
        &self.followers
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Runs every configured tick, writing reports to `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<RunSummary> {
        log::info!(
            "Running {} ticks of {:.4}s",
            self.options.ticks,
            self.options.dt
        );

        for _ in 0..self.options.ticks {
            self.step(out)?;
        }
        out.flush().context("Failed to flush reports")?;

        log::info!(
            "Finished: {} leader changes, {} requests ignored during cooldown",
            self.summary.leader_changes,
            self.summary.ignored_requests
        );
        Ok(self.summary)
    }

    /// Advances one tick: move the leaders, steer everyone, then re-elect
    /// and report when due.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.drive_leaders()?;
        self.sim.tick(self.options.dt);
        self.summary.ticks += 1;

        let tick = self.sim.ticks();
        if is_due(tick, self.options.reelect_every) {
            self.reelect()?;
        }
        if is_due(tick, self.options.report_every) {
            let report = TickReport::capture(tick, self.sim.elapsed(), self.sim.agents());
            writeln!(out, "{}", report.to_json()?).context("Failed to write report")?;
            self.summary.reports += 1;
        }
        Ok(())
    }

    fn drive_leaders(&mut self) -> Result<()> {
        let elapsed = self.sim.elapsed();
        for (index, leader) in self.leaders.iter().enumerate() {
            let (position, velocity) = orbit(&self.options, index, elapsed);
            self.sim.set_position(*leader, position)?;
            self.sim.set_velocity(*leader, velocity)?;
        }
        Ok(())
    }

    /// Points every follower at its nearest leader.
    fn reelect(&mut self) -> Result<()> {
        for follower in &self.followers {
            let Some(agent) = self.sim.agent(*follower) else {
                continue;
            };
            let Some(nearest) = nearest_leader(&self.sim, &self.leaders, agent.position) else {
                continue;
            };
            if agent.leader() == Some(nearest) {
                continue;
            }

            match self.sim.request_leader_change(*follower, nearest)? {
                LeaderChange::Changed { previous } => {
                    log::debug!("{} switched from {:?} to {}", follower, previous, nearest);
                    self.summary.leader_changes += 1;
                }
                LeaderChange::Ignored { remaining } => {
                    log::trace!("{} still locked for {:.2}s", follower, remaining);
                    self.summary.ignored_requests += 1;
                }
            }
        }
        Ok(())
    }
}

fn is_due(tick: u64, every: u64) -> bool {
    every > 0 && tick % every == 0
}

/// Position and velocity of leader `index` after `elapsed` seconds
fn orbit(options: &RunOptions, index: usize, elapsed: f32) -> (Vec3, Vec3) {
    let phase = TAU * index as f32 / options.leaders as f32;
    let angular_speed = TAU / options.orbit_period;
    let angle = phase + angular_speed * elapsed;
    let (sin, cos) = angle.sin_cos();

    let position = Vec3::new(cos, 0.0, sin) * options.orbit_radius;
    let velocity = Vec3::new(-sin, 0.0, cos) * options.orbit_radius * angular_speed;
    (position, velocity)
}

fn nearest_leader(
    sim: &Simulation<CAPACITY>,
    leaders: &[AgentId],
    position: Vec3,
) -> Option<AgentId> {
    leaders
        .iter()
        .filter_map(|id| sim.agent(*id).map(|leader| (*id, leader.position)))
        .min_by(|(_, a), (_, b)| {
            a.distance_squared(position)
                .total_cmp(&b.distance_squared(position))
        })
        .map(|(id, _)| id)
}

fn random_vector(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..=extent),
        rng.gen_range(-extent..=extent),
        rng.gen_range(-extent..=extent),
    )
}

//! Flocking rules for a single agent.
//!
//! Every rule reads the agent and its flockmates and returns a velocity
//! contribution; nothing here mutates state except [`apply_tick`].

use glam::{Mat3, Quat, Vec3};

use crate::agent::Agent;

/// Divisors applied to each rule before the terms are summed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringFactors {
    pub cohesion: f32,
    pub separation: f32,
    pub alignment: f32,
    pub follow_leader: f32,
}

impl Default for SteeringFactors {
    fn default() -> Self {
        Self {
            cohesion: 100.0,
            separation: 1.0,
            alignment: 8.0,
            follow_leader: 8.0,
        }
    }
}

/// The four rule contributions for one agent and one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringTerms {
    pub cohesion: Vec3,
    pub separation: Vec3,
    pub alignment: Vec3,
    pub follow_leader: Vec3,
}

impl SteeringTerms {
    pub fn total(&self) -> Vec3 {
        self.cohesion + self.separation + self.alignment + self.follow_leader
    }
}

/// Steer towards the mean position of the flockmates.
pub fn cohesion<'a, I>(agent: &Agent, flockmates: I, factors: &SteeringFactors) -> Vec3
where
    I: Iterator<Item = &'a Agent>,
{
    let mut center = Vec3::ZERO;
    let mut count = 0;

    for mate in flockmates {
        center += mate.position;
        count += 1;
    }

    if count == 0 {
        return Vec3::ZERO;
    }

    center /= count as f32;
    (center - agent.position) / factors.cohesion
}

/// Push away from every flockmate within the agent's crowded distance.
pub fn separation<'a, I>(agent: &Agent, flockmates: I, factors: &SteeringFactors) -> Vec3
where
    I: Iterator<Item = &'a Agent>,
{
    let mut steering = Vec3::ZERO;

    for mate in flockmates {
        if agent.position.distance(mate.position) <= agent.crowded_distance() {
            steering += agent.position - mate.position;
        }
    }

    steering / factors.separation
}

/// Match the mean velocity of the flockmates.
pub fn alignment<'a, I>(agent: &Agent, flockmates: I, factors: &SteeringFactors) -> Vec3
where
    I: Iterator<Item = &'a Agent>,
{
    let mut average = Vec3::ZERO;
    let mut count = 0;

    for mate in flockmates {
        average += mate.velocity;
        count += 1;
    }

    if count == 0 {
        return Vec3::ZERO;
    }

    average /= count as f32;
    (average - agent.velocity) / factors.alignment
}

pub fn follow_leader(agent: &Agent, leader_position: Vec3, factors: &SteeringFactors) -> Vec3 {
    (leader_position - agent.position) / factors.follow_leader
}

/// Evaluates every rule separately.
///
/// `flockmates` must not contain `agent` itself.
pub fn steering_terms<'a, I>(
    agent: &Agent,
    flockmates: I,
    leader_position: Vec3,
    factors: &SteeringFactors,
) -> SteeringTerms
where
    I: Iterator<Item = &'a Agent> + Clone,
{
    SteeringTerms {
        cohesion: cohesion(agent, flockmates.clone(), factors),
        separation: separation(agent, flockmates.clone(), factors),
        alignment: alignment(agent, flockmates, factors),
        follow_leader: follow_leader(agent, leader_position, factors),
    }
}

/// Additive velocity change for this tick. The caller applies it with
/// [`apply_tick`].
pub fn velocity_delta<'a, I>(
    agent: &Agent,
    flockmates: I,
    leader_position: Vec3,
    factors: &SteeringFactors,
) -> Vec3
where
    I: Iterator<Item = &'a Agent> + Clone,
{
    steering_terms(agent, flockmates, leader_position, factors).total()
}

/// Applies a velocity delta, caps the speed and turns the agent towards
/// its heading.
///
/// The orientation blend is a fixed fraction per call, so turning speed
/// depends on the tick rate.
pub fn apply_tick(agent: &mut Agent, delta: Vec3, orientation_blend: f32) {
    agent.velocity = clamp_speed(agent.velocity + delta, agent.max_speed());

    if let Some(target) = look_rotation(agent.velocity) {
        agent.orientation = agent.orientation.slerp(target, orientation_blend);
    }
}

/// Rescales `velocity` so its length never exceeds `max_speed`, keeping the
/// direction. Rounding can leave `velocity * (max / length)` a few ulps
/// long, so the result is shrunk until it fits.
///
/// Unlike `Vec3::clamp_length_max`, `clamp_speed(v, max).length() <= max`
/// holds exactly.
pub fn clamp_speed(velocity: Vec3, max_speed: f32) -> Vec3 {
    let length = velocity.length();
    if length <= max_speed {
        return velocity;
    }

    let mut clamped = velocity * (max_speed / length);
    // each step shaves at least one ulp off every normal component
    for _ in 0..8 {
        if clamped.length() <= max_speed {
            break;
        }
        clamped *= 1.0 - f32::EPSILON;
    }
    clamped
}

/// Rotation that points +Z along `forward` with +Y kept as close to up as
/// possible. Returns `None` for a zero vector.
pub fn look_rotation(forward: Vec3) -> Option<Quat> {
    let forward = forward.try_normalize()?;

    match Vec3::Y.cross(forward).try_normalize() {
        Some(right) => {
            let up = forward.cross(right);
            Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)))
        }
        // Heading straight up or down
        None => Some(Quat::from_rotation_arc(Vec3::Z, forward)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, AgentId};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPSILON: f32 = 1e-5;

    fn agent_at(id: u32, position: Vec3, velocity: Vec3) -> Agent {
        let config = AgentConfig {
            leader_change_cooldown: 1.0,
            max_speed: 10.0,
            crowded_distance: 5.0,
        };
        Agent::new(AgentId::new(id), config, position, velocity)
    }

    #[test]
    fn test_worked_example() {
        let agent = agent_at(0, Vec3::ZERO, Vec3::X);
        let mates = [agent_at(1, Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO)];
        let leader = Vec3::new(0.0, 0.0, 8.0);
        let factors = SteeringFactors::default();

        let terms = steering_terms(&agent, mates.iter(), leader, &factors);

        assert!(terms.cohesion.abs_diff_eq(Vec3::new(0.1, 0.0, 0.0), EPSILON));
        assert_eq!(terms.separation, Vec3::ZERO);
        assert!(terms.alignment.abs_diff_eq(Vec3::new(-0.125, 0.0, 0.0), EPSILON));
        assert!(terms.follow_leader.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));

        let delta = velocity_delta(&agent, mates.iter(), leader, &factors);
        assert!(delta.abs_diff_eq(Vec3::new(-0.025, 0.0, 1.0), EPSILON));
    }

    #[test]
    fn test_empty_flock_only_follows_leader() {
        let agent = agent_at(0, Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 0.0, 0.0));
        let leader = Vec3::new(9.0, 2.0, 3.0);
        let factors = SteeringFactors::default();
        let none: [Agent; 0] = [];

        let terms = steering_terms(&agent, none.iter(), leader, &factors);

        assert_eq!(terms.cohesion, Vec3::ZERO);
        assert_eq!(terms.alignment, Vec3::ZERO);
        assert_eq!(terms.separation, Vec3::ZERO);
        assert!(!terms.total().is_nan());
        assert_eq!(terms.total(), follow_leader(&agent, leader, &factors));
    }

    #[test]
    fn test_cohesion_divides_by_flockmate_count() {
        let agent = agent_at(0, Vec3::ZERO, Vec3::ZERO);
        let mates = [
            agent_at(1, Vec3::new(100.0, 0.0, 0.0), Vec3::ZERO),
            agent_at(2, Vec3::new(0.0, 100.0, 0.0), Vec3::ZERO),
        ];

        let steer = cohesion(&agent, mates.iter(), &SteeringFactors::default());

        assert!(steer.abs_diff_eq(Vec3::new(0.5, 0.5, 0.0), EPSILON));
    }

    #[test]
    fn test_separation_sums_crowded_mates_only() {
        let agent = agent_at(0, Vec3::ZERO, Vec3::ZERO);
        let mates = [
            agent_at(1, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO),
            agent_at(2, Vec3::new(0.0, -2.0, 0.0), Vec3::ZERO),
            // exactly at the crowded distance still counts
            agent_at(3, Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO),
            agent_at(4, Vec3::new(6.0, 0.0, 0.0), Vec3::ZERO),
        ];

        let steer = separation(&agent, mates.iter(), &SteeringFactors::default());

        assert_eq!(steer, Vec3::new(-1.0, 2.0, -5.0));
    }

    #[test]
    fn test_separation_is_zero_when_nobody_is_close() {
        let agent = agent_at(0, Vec3::ZERO, Vec3::ZERO);
        let mates = [
            agent_at(1, Vec3::new(5.5, 0.0, 0.0), Vec3::ZERO),
            agent_at(2, Vec3::new(-20.0, 3.0, 1.0), Vec3::ZERO),
        ];

        let steer = separation(&agent, mates.iter(), &SteeringFactors::default());

        assert_eq!(steer, Vec3::ZERO);
    }

    #[test]
    fn test_alignment_steers_towards_mean_velocity() {
        let agent = agent_at(0, Vec3::ZERO, Vec3::ZERO);
        let mates = [
            agent_at(1, Vec3::new(50.0, 0.0, 0.0), Vec3::new(8.0, 0.0, 0.0)),
            agent_at(2, Vec3::new(-50.0, 0.0, 0.0), Vec3::new(0.0, 8.0, 0.0)),
        ];

        let steer = alignment(&agent, mates.iter(), &SteeringFactors::default());

        assert!(steer.abs_diff_eq(Vec3::new(0.5, 0.5, 0.0), EPSILON));
    }

    #[test]
    fn test_apply_tick_caps_speed() {
        let mut agent = agent_at(0, Vec3::ZERO, Vec3::new(9.0, 0.0, 0.0));

        apply_tick(&mut agent, Vec3::new(3.0, 4.0, 0.0), 0.2);

        assert!(agent.velocity.length() <= agent.max_speed());
        assert!(agent
            .velocity
            .normalize()
            .abs_diff_eq(Vec3::new(12.0, 4.0, 0.0).normalize(), EPSILON));
    }

    #[test]
    fn test_clamped_speed_never_exceeds_limit() {
        let mut rng = StdRng::seed_from_u64(2024);

        for _ in 0..2000 {
            let velocity = Vec3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            let max_speed = rng.gen_range(0.0..20.0);

            let clamped = clamp_speed(velocity, max_speed);

            assert!(clamped.length() <= max_speed, "{} > {}", clamped.length(), max_speed);
            if velocity.length() > max_speed && max_speed > 0.0 {
                assert!(clamped.normalize().abs_diff_eq(velocity.normalize(), 1e-4));
                assert!(max_speed - clamped.length() < 1e-4);
            }
        }
    }

    #[test]
    fn test_clamp_to_zero_speed() {
        assert_eq!(clamp_speed(Vec3::new(3.0, 4.0, 0.0), 0.0), Vec3::ZERO);
        assert_eq!(clamp_speed(Vec3::ZERO, 0.0), Vec3::ZERO);
    }

    #[test]
    fn test_apply_tick_keeps_slow_velocity() {
        let mut agent = agent_at(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));

        apply_tick(&mut agent, Vec3::new(0.0, 2.0, 0.0), 0.2);

        assert_eq!(agent.velocity, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_zero_velocity_stays_zero_and_keeps_orientation() {
        let mut agent = agent_at(0, Vec3::ZERO, Vec3::ZERO);
        let before = Quat::from_rotation_y(0.3);
        agent.orientation = before;

        apply_tick(&mut agent, Vec3::ZERO, 0.2);

        assert_eq!(agent.velocity, Vec3::ZERO);
        assert_eq!(agent.orientation, before);
    }

    #[test]
    fn test_orientation_converges_on_heading() {
        let mut agent = agent_at(0, Vec3::ZERO, Vec3::X);

        for _ in 0..100 {
            apply_tick(&mut agent, Vec3::ZERO, 0.2);
        }

        let forward = agent.orientation * Vec3::Z;
        assert!(forward.abs_diff_eq(Vec3::X, 1e-3));
    }

    #[test]
    fn test_orientation_blends_partially_per_tick() {
        let mut agent = agent_at(0, Vec3::ZERO, Vec3::X);

        apply_tick(&mut agent, Vec3::ZERO, 0.2);

        let turned = agent.orientation.angle_between(Quat::IDENTITY);
        let full = look_rotation(Vec3::X).map(|q| q.angle_between(Quat::IDENTITY));
        assert!(turned > 0.0);
        assert!(full.is_some_and(|full| turned < full));
    }

    #[test]
    fn test_orientation_turns_a_fifth_of_the_way() {
        let mut agent = agent_at(0, Vec3::ZERO, Vec3::X);
        let target = look_rotation(Vec3::X).unwrap();
        let full = target.angle_between(Quat::IDENTITY);

        apply_tick(&mut agent, Vec3::ZERO, 0.2);

        let turned = agent.orientation.angle_between(Quat::IDENTITY);
        assert!((full - core::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!((turned - 0.2 * full).abs() < 1e-5, "turned {} of {}", turned, full);
        let remaining = agent.orientation.angle_between(target);
        assert!((remaining - 0.8 * full).abs() < 1e-5);
    }

    #[test]
    fn test_look_rotation_points_forward() {
        let heading = Vec3::new(1.0, 1.0, -2.0);
        let rotation = look_rotation(heading);

        assert!(rotation.is_some_and(|q| (q * Vec3::Z).abs_diff_eq(heading.normalize(), EPSILON)));
        assert_eq!(look_rotation(Vec3::ZERO), None);
    }

    #[test]
    fn test_look_rotation_straight_up() {
        let rotation = look_rotation(Vec3::new(0.0, 3.0, 0.0));

        assert!(rotation.is_some_and(|q| (q * Vec3::Z).abs_diff_eq(Vec3::Y, EPSILON)));
    }
}

//! Car kinematics with grip/drift handling.

use rand::Rng;

use crate::config::{CarTuning, FieldConfig};
use crate::input::InputSnapshot;
use crate::particles::ParticleSystem;
use crate::vec2::{self, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Radians, never wrapped
    pub heading: f64,
    /// Consecutive ticks of handbrake drift above the slip threshold
    pub drift_charge: u32,
    pub handbrake: bool,
    /// Drift indicator in [0, 100] derived from lateral slip
    pub drift_amount: f64,
}

/// What happened during one [`Vehicle::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Forward speed granted by a released drift, 0 when no boost fired
    pub boost: f64,
    /// Lateral slip magnitude after friction
    pub slip: f64,
}

impl Vehicle {
    pub fn new(pos: Vec2, heading: f64) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            heading,
            drift_charge: 0,
            handbrake: false,
            drift_amount: 0.0,
        }
    }

    pub fn speed(&self) -> f64 {
        vec2::length(self.vel)
    }

    /// Move to a spawn point at rest, clearing drift state.
    pub fn place(&mut self, pos: Vec2, heading: f64) {
        *self = Self::new(pos, heading);
    }

    /// Advance one tick under `input`.
    pub fn step(
        &mut self,
        input: &InputSnapshot,
        tuning: &CarTuning,
        field: &FieldConfig,
        fx: &mut ParticleSystem,
        rng: &mut impl Rng,
    ) -> StepReport {
        let prev_handbrake = self.handbrake;
        self.handbrake = input.brake;

        // Velocity is resolved in the frame of the heading at the start of the tick.
        let frame = self.heading;
        let (mut forward, mut lateral) = vec2::to_local(self.vel, frame);

        if input.forward {
            forward += tuning.acceleration;
        }
        if input.back {
            forward -= tuning.acceleration * tuning.reverse_factor;
        }

        let mut turn = input.steer() * tuning.turn_speed * (forward.abs() / 2.0 + 0.3);
        if forward < 0.0 {
            turn = -turn;
        }
        self.heading += turn;

        let side_friction = if self.handbrake {
            tuning.handbrake_side_friction
        } else {
            tuning.side_friction
        };
        forward = vec2::damp(forward, tuning.forward_friction);
        lateral = vec2::damp(lateral, side_friction);

        let slip = lateral.abs();
        self.drift_amount = (slip * 25.0).min(100.0);

        let mut boost = 0.0;
        if self.handbrake && slip > tuning.drift_slip_threshold {
            fx.emit_drift(self.pos, frame, rng);
            self.drift_charge += 1;
            if self.drift_charge > tuning.drift_charge_threshold {
                fx.emit_charged(self.pos, frame, rng);
            }
        } else {
            if prev_handbrake
                && !self.handbrake
                && self.drift_charge > tuning.drift_charge_threshold
            {
                boost = tuning.drift_boost;
                forward += boost;
                fx.emit_boost(self.pos, rng);
                tracing::debug!(charge = self.drift_charge, "drift boost released");
            }
            self.drift_charge = 0;
        }

        self.vel = vec2::clamp_length(vec2::from_local(forward, lateral, frame), tuning.max_speed);
        self.pos = vec2::add(self.pos, self.vel);
        self.clamp_to_field(tuning, field);

        StepReport { boost, slip }
    }

    /// Free movement with uniform damping, used while a celebration plays out.
    pub fn coast(&mut self, damping: f64, tuning: &CarTuning, field: &FieldConfig) {
        self.pos = vec2::add(self.pos, self.vel);
        self.vel = vec2::scale(self.vel, damping);
        self.clamp_to_field(tuning, field);
    }

    fn clamp_to_field(&mut self, tuning: &CarTuning, field: &FieldConfig) {
        let bounce = tuning.wall_bounce;
        if self.pos.x < field.min_x() {
            self.pos.x = field.min_x();
            self.vel.x = self.vel.x.abs() * bounce;
        }
        if self.pos.x > field.max_x() {
            self.pos.x = field.max_x();
            self.vel.x = -self.vel.x.abs() * bounce;
        }
        if self.pos.y < field.min_y() {
            self.pos.y = field.min_y();
            self.vel.y = self.vel.y.abs() * bounce;
        }
        if self.pos.y > field.max_y() {
            self.pos.y = field.max_y();
            self.vel.y = -self.vel.y.abs() * bounce;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Rig {
        tuning: CarTuning,
        field: FieldConfig,
        fx: ParticleSystem,
        rng: ChaCha8Rng,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                tuning: CarTuning::default(),
                field: FieldConfig::default(),
                fx: ParticleSystem::default(),
                rng: ChaCha8Rng::seed_from_u64(99),
            }
        }

        fn step(&mut self, car: &mut Vehicle, input: InputSnapshot) -> StepReport {
            car.step(&input, &self.tuning, &self.field, &mut self.fx, &mut self.rng)
        }
    }

    fn brake() -> InputSnapshot {
        InputSnapshot {
            brake: true,
            ..Default::default()
        }
    }

    #[test]
    fn coasting_car_stays_on_the_pitch() {
        let rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(760.0, 300.0), 0.0);
        car.vel = Vec2::new(10.0, 0.0);
        for _ in 0..90 {
            car.coast(0.95, &rig.tuning, &rig.field);
            assert!(car.pos.x <= rig.field.max_x());
        }
        assert!(car.vel.x <= 0.0);
    }

    #[test]
    fn throttle_accelerates_along_heading() {
        let mut rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        let input = InputSnapshot {
            forward: true,
            ..Default::default()
        };
        rig.step(&mut car, input);
        assert!((car.vel.x - 0.08 * 0.98).abs() < 1e-12);
        assert!(car.vel.y.abs() < 1e-12);
    }

    #[test]
    fn idle_tick_never_gains_speed() {
        let mut rig = Rig::new();
        let mut seed = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let mut car = Vehicle::new(
                Vec2::new(
                    seed.gen_range(0.0..800.0),
                    seed.gen_range(0.0..600.0),
                ),
                seed.gen_range(-20.0..20.0),
            );
            car.vel = Vec2::new(seed.gen_range(-4.0..4.0), seed.gen_range(-4.0..4.0));
            car.drift_charge = seed.gen_range(0..200);
            let before = car.speed();
            rig.step(&mut car, InputSnapshot::default());
            assert!(car.speed() <= before + 1e-12);
        }
    }

    #[test]
    fn speed_is_clamped_to_max() {
        let mut rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(400.0, 300.0), 0.7);
        car.vel = vec2::from_angle(0.7);
        car.vel = vec2::scale(car.vel, 3.99);
        let input = InputSnapshot {
            forward: true,
            right: true,
            ..Default::default()
        };
        for _ in 0..200 {
            rig.step(&mut car, input);
            assert!(car.speed() <= rig.tuning.max_speed + 1e-9);
        }
    }

    #[test]
    fn steering_inverts_in_reverse() {
        let mut rig = Rig::new();
        let left = InputSnapshot {
            left: true,
            ..Default::default()
        };

        let mut forward_car = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        forward_car.vel = Vec2::new(2.0, 0.0);
        rig.step(&mut forward_car, left);
        assert!(forward_car.heading < 0.0);

        let mut reversing = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        reversing.vel = Vec2::new(-2.0, 0.0);
        rig.step(&mut reversing, left);
        assert!(reversing.heading > 0.0);
    }

    #[test]
    fn handbrake_loosens_lateral_grip() {
        let mut rig = Rig::new();
        let mut gripping = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        gripping.vel = Vec2::new(0.0, 2.0);
        let mut drifting = gripping.clone();

        rig.step(&mut gripping, InputSnapshot::default());
        rig.step(&mut drifting, brake());

        assert!((gripping.vel.y - 2.0 * 0.7).abs() < 1e-12);
        assert!((drifting.vel.y - 2.0 * 0.97).abs() < 1e-12);
        assert!(drifting.drift_amount > gripping.drift_amount);
    }

    #[test]
    fn drift_indicator_is_capped() {
        let mut rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        car.vel = Vec2::new(0.0, 10.0);
        rig.step(&mut car, brake());
        assert_eq!(car.drift_amount, 100.0);
    }

    #[test]
    fn released_drift_grants_single_boost() {
        let mut rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        car.vel = Vec2::new(0.0, 3.9);

        for _ in 0..61 {
            let report = rig.step(&mut car, brake());
            assert!(report.slip > rig.tuning.drift_slip_threshold);
            assert_eq!(report.boost, 0.0);
        }
        assert_eq!(car.drift_charge, 61);
        assert!(!rig.fx.sparks.is_empty());

        let flames_before = rig.fx.flames.len();
        let report = rig.step(&mut car, InputSnapshot::default());
        assert_eq!(report.boost, 4.0);
        assert_eq!(car.drift_charge, 0);
        assert!(rig.fx.flames.len() >= flames_before + 30 - 1);

        let report = rig.step(&mut car, InputSnapshot::default());
        assert_eq!(report.boost, 0.0);
    }

    #[test]
    fn short_drift_gives_no_boost() {
        let mut rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(400.0, 300.0), 0.0);
        car.vel = Vec2::new(0.0, 3.9);
        for _ in 0..30 {
            rig.step(&mut car, brake());
        }
        let report = rig.step(&mut car, InputSnapshot::default());
        assert_eq!(report.boost, 0.0);
        assert_eq!(car.drift_charge, 0);
    }

    #[test]
    fn walls_reflect_and_damp() {
        let mut rig = Rig::new();
        let mut car = Vehicle::new(Vec2::new(21.0, 300.0), 0.0);
        car.vel = Vec2::new(-3.0, 0.0);
        rig.step(&mut car, InputSnapshot::default());
        assert_eq!(car.pos.x, 20.0);
        assert!(car.vel.x > 0.0);
        assert!(car.vel.x <= 3.0 * 0.5);

        let mut car = Vehicle::new(Vec2::new(400.0, 579.0), 0.0);
        car.vel = Vec2::new(0.0, 3.0);
        rig.step(&mut car, InputSnapshot::default());
        assert_eq!(car.pos.y, 580.0);
        assert!(car.vel.y < 0.0);
    }
}

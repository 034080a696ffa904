/// Hands-off driver that chases the ball and lines up shots on the opponent's goal.
/// Used by the headless client so a session can play without a keyboard.
use std::f64::consts::PI;

use carball_shared::ball::Ball;
use carball_shared::config::FieldConfig;
use carball_shared::input::InputSnapshot;
use carball_shared::sim::MatchContext;
use carball_shared::vec2::{self, Vec2};
use carball_shared::vehicle::Vehicle;

/// Heading error (radians) tolerated before steering.
const STEER_DEADBAND: f64 = 0.12;
/// Heading error beyond which the handbrake is pulled to swing around.
const BRAKE_ANGLE: f64 = 1.6;
const BRAKE_MIN_SPEED: f64 = 2.0;
/// How far behind the ball the car aims, along the shot line.
const BEHIND_BALL: f64 = 22.0;
/// Maximum vertical offset of the aim point inside the goal mouth.
const AIM_SPREAD: f64 = 20.0;

#[derive(Debug)]
pub struct Autopilot {
    aim_offset: f64,
    seed: u32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::with_seed(1)
    }
}

impl Autopilot {
    pub fn with_seed(seed: u32) -> Self {
        Self {
            aim_offset: 0.0,
            seed,
        }
    }

    fn next_random(&mut self) -> f64 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223) & 0x7fff_ffff;
        self.seed as f64 / 0x7fff_ffffu32 as f64
    }

    /// Pick a new spot in the goal mouth to aim for. Call at every kickoff.
    pub fn reset(&mut self) {
        self.aim_offset = (self.next_random() * 2.0 - 1.0) * AIM_SPREAD;
    }

    pub fn aim_offset(&self) -> f64 {
        self.aim_offset
    }

    /// Input for the car this peer controls.
    pub fn drive_local(&self, ctx: &MatchContext) -> InputSnapshot {
        let index = ctx.local_index();
        // Player 1 starts on the left and attacks the right goal
        let attack_right = index == 0;
        self.drive(&ctx.cars[index], &ctx.ball, &ctx.config.field, attack_right)
    }

    pub fn drive(
        &self,
        car: &Vehicle,
        ball: &Ball,
        field: &FieldConfig,
        attack_right: bool,
    ) -> InputSnapshot {
        let goal_x = if attack_right { field.width } else { 0.0 };
        let goal = Vec2::new(goal_x, field.center().y + self.aim_offset);
        let shot_line = vec2::normalize(vec2::sub(goal, ball.pos));
        let target = vec2::sub(ball.pos, vec2::scale(shot_line, BEHIND_BALL));

        let to_target = vec2::sub(target, car.pos);
        let desired = to_target.y.atan2(to_target.x);
        let error = wrap_angle(desired - car.heading);

        InputSnapshot {
            forward: true,
            back: false,
            left: error < -STEER_DEADBAND,
            right: error > STEER_DEADBAND,
            brake: error.abs() > BRAKE_ANGLE && car.speed() > BRAKE_MIN_SPEED,
        }
    }
}

/// Wrap to (-PI, PI].
fn wrap_angle(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

use crate::config::{BallTuning, FieldConfig};
use crate::vec2::{self, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f64,
}

impl Ball {
    pub fn new(pos: Vec2, radius: f64) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
        }
    }

    /// Back to the center spot, at rest.
    pub fn reset(&mut self, field: &FieldConfig) {
        self.pos = field.center();
        self.vel = Vec2::ZERO;
    }

    /// Damp, integrate, then bounce off the touchlines. The goal lines only bounce the
    /// ball outside the goal mouth, so a ball on target passes into the goal.
    pub fn step(&mut self, tuning: &BallTuning, field: &FieldConfig) {
        self.vel = vec2::scale(self.vel, tuning.damping);
        self.pos = vec2::add(self.pos, self.vel);

        let r = self.radius;
        let bounce = -tuning.restitution;
        let in_mouth = field.in_goal_mouth(self.pos.y);

        if self.pos.x - r < field.min_x() && !in_mouth {
            self.pos.x = field.min_x() + r;
            self.vel.x *= bounce;
        }
        if self.pos.x + r > field.max_x() && !in_mouth {
            self.pos.x = field.max_x() - r;
            self.vel.x *= bounce;
        }
        if self.pos.y - r < field.min_y() {
            self.pos.y = field.min_y() + r;
            self.vel.y *= bounce;
        }
        if self.pos.y + r > field.max_y() {
            self.pos.y = field.max_y() - r;
            self.vel.y *= bounce;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BallTuning, FieldConfig) {
        (BallTuning::default(), FieldConfig::default())
    }

    #[test]
    fn velocity_decays_uniformly() {
        let (tuning, field) = setup();
        let mut ball = Ball::new(field.center(), tuning.radius);
        ball.vel = Vec2::new(2.0, -1.0);
        ball.step(&tuning, &field);
        assert!((ball.vel.x - 1.96).abs() < 1e-12);
        assert!((ball.vel.y + 0.98).abs() < 1e-12);
        assert!((ball.pos.x - 401.96).abs() < 1e-12);
    }

    #[test]
    fn bounces_off_goal_line_outside_mouth() {
        let (tuning, field) = setup();
        let mut ball = Ball::new(Vec2::new(34.0, 100.0), tuning.radius);
        ball.vel = Vec2::new(-5.0, 0.0);
        ball.step(&tuning, &field);
        assert_eq!(ball.pos.x, 32.0);
        assert!((ball.vel.x - 5.0 * 0.98 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn passes_through_goal_mouth() {
        let (tuning, field) = setup();
        for y in [241.0, 300.0, 359.0] {
            let mut ball = Ball::new(Vec2::new(34.0, y), tuning.radius);
            ball.vel = Vec2::new(-5.0, 0.0);
            ball.step(&tuning, &field);
            assert!(ball.vel.x < 0.0, "reflected at y={y}");
            assert!(ball.pos.x - ball.radius < field.min_x());
        }

        let mut right = Ball::new(Vec2::new(766.0, 300.0), tuning.radius);
        right.vel = Vec2::new(5.0, 0.0);
        right.step(&tuning, &field);
        assert!(right.vel.x > 0.0);
    }

    #[test]
    fn mouth_edges_still_reflect() {
        let (tuning, field) = setup();
        let mut ball = Ball::new(Vec2::new(34.0, 240.0), tuning.radius);
        ball.vel = Vec2::new(-5.0, 0.0);
        ball.step(&tuning, &field);
        assert!(ball.vel.x > 0.0);
    }

    #[test]
    fn touchlines_always_reflect() {
        let (tuning, field) = setup();
        let mut ball = Ball::new(Vec2::new(400.0, 570.0), tuning.radius);
        ball.vel = Vec2::new(0.0, 4.0);
        ball.step(&tuning, &field);
        assert_eq!(ball.pos.y, 568.0);
        assert!(ball.vel.y < 0.0);
    }

    #[test]
    fn reset_returns_to_center_at_rest() {
        let (tuning, field) = setup();
        let mut ball = Ball::new(Vec2::new(10.0, 10.0), tuning.radius);
        ball.vel = Vec2::new(3.0, 3.0);
        ball.reset(&field);
        assert_eq!(ball.pos, field.center());
        assert_eq!(ball.vel, Vec2::ZERO);
    }
}

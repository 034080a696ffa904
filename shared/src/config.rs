use crate::vec2::Vec2;

/// Pitch geometry
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub width: f64,
    pub height: f64,
    /// Distance from the canvas edge to the playable boundary (also the goal line).
    pub margin: f64,
    /// Vertical span of each goal mouth, centered on the pitch.
    pub goal_height: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            margin: 20.0,
            goal_height: 120.0,
        }
    }
}

impl FieldConfig {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn goal_top(&self) -> f64 {
        (self.height - self.goal_height) / 2.0
    }

    pub fn goal_bottom(&self) -> f64 {
        self.goal_top() + self.goal_height
    }

    /// Strictly inside the goal mouth's vertical span.
    pub fn in_goal_mouth(&self, y: f64) -> bool {
        y > self.goal_top() && y < self.goal_bottom()
    }

    pub fn min_x(&self) -> f64 {
        self.margin
    }

    pub fn max_x(&self) -> f64 {
        self.width - self.margin
    }

    pub fn min_y(&self) -> f64 {
        self.margin
    }

    pub fn max_y(&self) -> f64 {
        self.height - self.margin
    }

    /// Single car at the center spot, pointing up the pitch.
    pub fn practice_spawn(&self) -> (Vec2, f64) {
        (self.center(), -std::f64::consts::FRAC_PI_2)
    }

    /// Both cars 100 units in from their own goal, facing each other.
    pub fn match_spawns(&self) -> [(Vec2, f64); 2] {
        let y = self.height / 2.0;
        [
            (Vec2::new(100.0, y), 0.0),
            (Vec2::new(self.width - 100.0, y), std::f64::consts::PI),
        ]
    }
}

/// Vehicle tuning, identical for both cars.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarTuning {
    pub acceleration: f64,
    /// Fraction of `acceleration` applied when reversing
    pub reverse_factor: f64,
    pub max_speed: f64,
    pub turn_speed: f64,
    pub forward_friction: f64,
    pub side_friction: f64,
    /// Lateral friction while the handbrake is held (the drift)
    pub handbrake_side_friction: f64,
    /// Lateral slip above which drift effects and charge kick in
    pub drift_slip_threshold: f64,
    /// Ticks of sustained drift before the boost is armed
    pub drift_charge_threshold: u32,
    pub drift_boost: f64,
    pub width: f64,
    pub length: f64,
    /// Speed retained when bouncing off a wall
    pub wall_bounce: f64,
}

impl Default for CarTuning {
    fn default() -> Self {
        Self {
            acceleration: 0.08,
            reverse_factor: 0.8,
            max_speed: 4.0,
            turn_speed: 0.05,
            forward_friction: 0.02,
            side_friction: 0.3,
            handbrake_side_friction: 0.03,
            drift_slip_threshold: 0.4,
            drift_charge_threshold: 60,
            drift_boost: 4.0,
            width: 14.0,
            length: 24.0,
            wall_bounce: 0.5,
        }
    }
}

impl CarTuning {
    /// Collision radius: half of the larger body extent.
    pub fn half_extent(&self) -> f64 {
        self.width.max(self.length) / 2.0
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallTuning {
    pub radius: f64,
    /// Per-axis velocity multiplier applied every tick
    pub damping: f64,
    /// Fraction of speed kept after a wall bounce
    pub restitution: f64,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            radius: 12.0,
            damping: 0.98,
            restitution: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionTuning {
    /// Extra separation added when pushing the ball out of a car
    pub ball_epsilon: f64,
    /// Fixed push along the contact normal
    pub ball_push: f64,
    /// Share of car velocity transferred to the ball
    pub car_velocity_share: f64,
    /// Recoil applied to each car when several touch the ball in one tick
    pub multi_hit_recoil: f64,
    pub car_restitution: f64,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            ball_epsilon: 0.1,
            ball_push: 2.0,
            car_velocity_share: 0.5,
            multi_hit_recoil: 4.0,
            car_restitution: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesConfig {
    pub celebration_ms: f64,
    /// Simulated frame duration used to advance the celebration timer
    pub frame_ms: f64,
    pub win_score: u32,
    /// Horizontal launch speed given to cars when a goal is scored
    pub launch_speed: f64,
    /// Maximum magnitude of the random vertical launch component
    pub launch_spread: f64,
    /// Per-frame velocity multiplier while cars coast during a celebration
    pub celebration_damping: f64,
    pub confetti_count: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            celebration_ms: 1500.0,
            frame_ms: 16.0,
            win_score: 11,
            launch_speed: 10.0,
            launch_spread: 6.0,
            celebration_damping: 0.95,
            confetti_count: 150,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub field: FieldConfig,
    pub car: CarTuning,
    pub ball: BallTuning,
    pub collision: CollisionTuning,
    pub rules: RulesConfig,
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), String> {
        let f = &self.field;
        if !(f.width.is_finite() && f.height.is_finite()) || f.width <= 0.0 || f.height <= 0.0 {
            return Err("field dimensions must be finite and > 0".to_string());
        }
        if f.margin < 0.0 || f.margin * 2.0 >= f.width.min(f.height) {
            return Err("field margin must leave a playable area".to_string());
        }
        if f.goal_height <= 0.0 || f.goal_height >= f.height - 2.0 * f.margin {
            return Err("goal_height must fit between the touchlines".to_string());
        }
        if !self.car.max_speed.is_finite() || self.car.max_speed <= 0.0 {
            return Err("car max_speed must be finite and > 0".to_string());
        }
        for (name, v) in [
            ("forward_friction", self.car.forward_friction),
            ("side_friction", self.car.side_friction),
            ("handbrake_side_friction", self.car.handbrake_side_friction),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be in [0, 1]"));
            }
        }
        if self.ball.radius <= 0.0 {
            return Err("ball radius must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.ball.damping) {
            return Err("ball damping must be in [0, 1]".to_string());
        }
        if self.rules.frame_ms <= 0.0 || self.rules.celebration_ms < 0.0 {
            return Err("frame_ms must be > 0 and celebration_ms >= 0".to_string());
        }
        if self.rules.win_score == 0 {
            return Err("win_score must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_game_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn goal_mouth_is_centered_and_strict() {
        let f = FieldConfig::default();
        assert_eq!(f.goal_top(), 240.0);
        assert_eq!(f.goal_bottom(), 360.0);
        assert!(f.in_goal_mouth(300.0));
        assert!(!f.in_goal_mouth(240.0));
        assert!(!f.in_goal_mouth(360.0));
    }

    #[test]
    fn oversized_goal_invalid() {
        let mut config = GameConfig::default();
        config.field.goal_height = 580.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn friction_out_of_range_invalid() {
        let mut config = GameConfig::default();
        config.car.side_friction = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.contains("side_friction"));
    }

    #[test]
    fn car_half_extent_uses_longer_side() {
        assert_eq!(CarTuning::default().half_extent(), 12.0);
    }

    #[test]
    fn match_spawns_face_each_other() {
        let f = FieldConfig::default();
        let [(p1, h1), (p2, h2)] = f.match_spawns();
        assert_eq!(p1, Vec2::new(100.0, 300.0));
        assert_eq!(p2, Vec2::new(700.0, 300.0));
        assert_eq!(h1, 0.0);
        assert_eq!(h2, std::f64::consts::PI);
    }
}

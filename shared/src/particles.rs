//! Transient visual-effect particles.
//!
//! The simulation produces these; only the renderer consumes them. Every update pass
//! removes particles whose life has run out, so no dead particle survives into the
//! next tick.

use rand::Rng;

use crate::vec2::{self, Vec2};

const TYRE_MARK_LIFE: f64 = 200.0;
const SMOKE_LIFE: f64 = 60.0;
const SPARK_LIFE: f64 = 30.0;
const TRAIL_FLAME_LIFE: f64 = 20.0;
const BURST_FLAME_LIFE: f64 = 25.0;
const BOOST_BURST_COUNT: usize = 30;
const CONFETTI_GRAVITY: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining life in ticks
    pub life: f64,
    /// Initial life, for fade computations
    pub max_life: Option<f64>,
    /// Opacity that tracks `life / 60` (smoke only)
    pub alpha: Option<f64>,
    /// Hue in degrees (confetti only)
    pub hue: Option<f64>,
}

impl Particle {
    fn new(pos: Vec2, vel: Vec2, life: f64) -> Self {
        Self {
            pos,
            vel,
            life,
            max_life: None,
            alpha: None,
            hue: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    pub tyre_marks: Vec<Particle>,
    pub smoke: Vec<Particle>,
    pub sparks: Vec<Particle>,
    pub flames: Vec<Particle>,
    pub confetti: Vec<Particle>,
}

impl ParticleSystem {
    pub fn len(&self) -> usize {
        self.tyre_marks.len()
            + self.smoke.len()
            + self.sparks.len()
            + self.flames.len()
            + self.confetti.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.tyre_marks.clear();
        self.smoke.clear();
        self.sparks.clear();
        self.flames.clear();
        self.confetti.clear();
    }

    /// Tyre mark plus a puff of smoke behind a drifting car.
    pub fn emit_drift(&mut self, pos: Vec2, heading: f64, rng: &mut impl Rng) {
        let dir = vec2::from_angle(heading);
        self.tyre_marks
            .push(Particle::new(pos, Vec2::ZERO, TYRE_MARK_LIFE));

        let mut puff = Particle::new(
            vec2::sub(pos, vec2::scale(dir, 15.0)),
            Vec2::new(
                (rng.gen::<f64>() - 0.5) * 0.5,
                -0.5 - rng.gen::<f64>() * 0.5,
            ),
            SMOKE_LIFE,
        );
        puff.alpha = Some(1.0);
        self.smoke.push(puff);
    }

    /// Sparks and a trailing flame while the drift boost is armed.
    pub fn emit_charged(&mut self, pos: Vec2, heading: f64, rng: &mut impl Rng) {
        let dir = vec2::from_angle(heading);
        for _ in 0..2 {
            self.sparks.push(Particle::new(
                vec2::sub(pos, vec2::scale(dir, 14.0)),
                Vec2::new(
                    (rng.gen::<f64>() - 0.5) * 4.0,
                    (rng.gen::<f64>() - 1.5) * 4.0,
                ),
                SPARK_LIFE,
            ));
        }

        let mut flame = Particle::new(
            vec2::sub(pos, vec2::scale(dir, 18.0)),
            vec2::scale(dir, -0.2),
            TRAIL_FLAME_LIFE,
        );
        flame.max_life = Some(TRAIL_FLAME_LIFE);
        self.flames.push(flame);
    }

    /// Flame burst fired when a charged drift is released.
    pub fn emit_boost(&mut self, pos: Vec2, rng: &mut impl Rng) {
        for _ in 0..BOOST_BURST_COUNT {
            let mut flame = Particle::new(
                pos,
                Vec2::new(
                    (rng.gen::<f64>() - 0.5) * 3.0,
                    (rng.gen::<f64>() - 0.5) * 3.0,
                ),
                BURST_FLAME_LIFE,
            );
            flame.max_life = Some(BURST_FLAME_LIFE);
            self.flames.push(flame);
        }
    }

    /// Replace any existing confetti with a fresh burst at `origin`.
    pub fn emit_confetti(&mut self, origin: Vec2, count: usize, rng: &mut impl Rng) {
        self.confetti.clear();
        self.confetti.reserve(count);
        for _ in 0..count {
            let mut bit = Particle::new(
                origin,
                Vec2::new(
                    (rng.gen::<f64>() - 0.5) * 8.0,
                    (rng.gen::<f64>() - 0.5) * 8.0 - 3.0,
                ),
                rng.gen::<f64>() * 60.0 + 40.0,
            );
            bit.hue = Some(rng.gen::<f64>() * 360.0);
            self.confetti.push(bit);
        }
    }

    /// Advance drift particles (tyre marks, smoke, sparks, flames) by one tick.
    pub fn update(&mut self) {
        for list in [
            &mut self.smoke,
            &mut self.tyre_marks,
            &mut self.sparks,
            &mut self.flames,
        ] {
            advance(list, 0.0);
        }
    }

    /// Advance confetti by one tick, with gravity.
    pub fn update_confetti(&mut self) {
        advance(&mut self.confetti, CONFETTI_GRAVITY);
    }
}

fn advance(list: &mut Vec<Particle>, gravity: f64) {
    for p in list.iter_mut() {
        p.vel.y += gravity;
        p.pos = vec2::add(p.pos, p.vel);
        p.life -= 1.0;
        if let Some(alpha) = p.alpha.as_mut() {
            *alpha = p.life / SMOKE_LIFE;
        }
    }
    list.retain(|p| p.life > 0.0);
}

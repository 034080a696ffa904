//! Car-ball and car-car contact resolution.
//!
//! Cars collide as circles of radius `max(width, length) / 2`.

use crate::ball::Ball;
use crate::config::{CarTuning, CollisionTuning};
use crate::vec2;
use crate::vehicle::Vehicle;

/// Push the ball out of `car` and kick it. Returns true on contact.
pub fn resolve_car_ball(
    car: &Vehicle,
    ball: &mut Ball,
    car_tuning: &CarTuning,
    tuning: &CollisionTuning,
) -> bool {
    let delta = vec2::sub(ball.pos, car.pos);
    let dist = vec2::length(delta);
    let min_dist = ball.radius + car_tuning.half_extent();
    if dist >= min_dist {
        return false;
    }

    // Coincident centers: push the ball out the front of the car.
    let normal = if dist < 1e-9 {
        vec2::from_angle(car.heading)
    } else {
        vec2::scale(delta, 1.0 / dist)
    };
    let overlap = min_dist - dist + tuning.ball_epsilon;

    ball.pos = vec2::add(ball.pos, vec2::scale(normal, overlap));
    ball.vel = vec2::add(
        ball.vel,
        vec2::add(
            vec2::scale(car.vel, tuning.car_velocity_share),
            vec2::scale(normal, tuning.ball_push),
        ),
    );
    true
}

/// When more than one car touched the ball this tick, knock each of them back
/// away from the ball.
pub fn apply_multi_hit_recoil(
    cars: &mut [Vehicle],
    hits: &[usize],
    ball: &Ball,
    tuning: &CollisionTuning,
) {
    if hits.len() < 2 {
        return;
    }
    for &i in hits {
        let Some(car) = cars.get_mut(i) else {
            continue;
        };
        let delta = vec2::sub(car.pos, ball.pos);
        let dist = vec2::length(delta);
        let normal = if dist > 0.0 {
            vec2::scale(delta, 1.0 / dist)
        } else {
            delta
        };
        car.vel = vec2::add(car.vel, vec2::scale(normal, tuning.multi_hit_recoil));
    }
}

/// Separate an overlapping pair and exchange an equal-mass elastic impulse.
/// Returns true if the pair overlapped.
pub fn resolve_car_pair(
    a: &mut Vehicle,
    b: &mut Vehicle,
    car_tuning: &CarTuning,
    tuning: &CollisionTuning,
) -> bool {
    let delta = vec2::sub(b.pos, a.pos);
    let dist = vec2::length(delta);
    let min_dist = car_tuning.half_extent() * 2.0;
    if dist >= min_dist || dist == 0.0 {
        return false;
    }

    let normal = vec2::scale(delta, 1.0 / dist);
    let half_overlap = (min_dist - dist) / 2.0;
    a.pos = vec2::sub(a.pos, vec2::scale(normal, half_overlap));
    b.pos = vec2::add(b.pos, vec2::scale(normal, half_overlap));

    let closing = vec2::dot(vec2::sub(a.vel, b.vel), normal);
    if closing < 0.0 {
        let impulse = -(1.0 + tuning.car_restitution) * closing / 2.0;
        a.vel = vec2::add(a.vel, vec2::scale(normal, impulse));
        b.vel = vec2::sub(b.vel, vec2::scale(normal, impulse));
    }
    true
}

/// Resolve every unordered pair of cars.
pub fn resolve_car_collisions(cars: &mut [Vehicle], car_tuning: &CarTuning, tuning: &CollisionTuning) {
    for i in 0..cars.len() {
        for j in (i + 1)..cars.len() {
            let (head, tail) = cars.split_at_mut(j);
            resolve_car_pair(&mut head[i], &mut tail[0], car_tuning, tuning);
        }
    }
}

//! The match simulation: owns every simulated body and advances them one frame at a time.
//!
//! A single [`MatchContext`] covers practice (one car, local authority) and networked
//! matches (two cars, host or guest authority). Only the host and local roles run the full
//! physics step; a guest mirrors whatever the host last sent.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ball::Ball;
use crate::collision;
use crate::config::GameConfig;
use crate::input::{ControlSource, InputSnapshot};
use crate::match_state::{detect_goal, GamePhase, GoalSide, MatchState};
use crate::particles::ParticleSystem;
use crate::protocol::{BallWire, CarWire, StateSnapshot};
use crate::vec2::Vec2;
use crate::vehicle::Vehicle;

/// Who is allowed to advance the physics on this peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Practice: nobody else is watching
    Local,
    /// Runs the simulation and pushes snapshots
    Host,
    /// Sends input and applies snapshots
    Guest,
}

/// Edges the sync layer cares about after a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub goal: Option<GoalSide>,
    pub celebration_finished: bool,
}

pub struct MatchContext {
    pub config: GameConfig,
    pub ball: Ball,
    pub cars: [Vehicle; 2],
    pub state: MatchState,
    pub particles: ParticleSystem,
    /// Run the guest's own car locally between snapshots
    pub predict_local: bool,
    authority: Authority,
    controls: [ControlSource; 2],
    local_index: usize,
    active_cars: usize,
    rng: ChaCha8Rng,
}

impl MatchContext {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let [(p1, h1), (p2, h2)] = config.field.match_spawns();
        Self {
            ball: Ball::new(config.field.center(), config.ball.radius),
            cars: [Vehicle::new(p1, h1), Vehicle::new(p2, h2)],
            state: MatchState::default(),
            particles: ParticleSystem::default(),
            predict_local: true,
            authority: Authority::Local,
            controls: [
                ControlSource::LocalKeyboard,
                ControlSource::RemoteRelay(InputSnapshot::default()),
            ],
            local_index: 0,
            active_cars: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn local_index(&self) -> usize {
        self.local_index
    }

    pub fn active_cars(&self) -> usize {
        self.active_cars
    }

    pub fn controls(&self) -> &[ControlSource; 2] {
        &self.controls
    }

    /// Single-player free play.
    pub fn start_practice(&mut self) -> bool {
        if !self.state.transition(GamePhase::Practice) {
            return false;
        }
        self.go_solo();
        true
    }

    /// Joined a room as `player_index` and waiting for both players to ready up.
    pub fn enter_waiting_room(&mut self, player_index: u8) -> bool {
        if !self.state.transition(GamePhase::WaitingRoom) {
            return false;
        }
        self.assign_roles(player_index);
        self.state.reset_scores();
        self.state.ready = [false; 2];
        self.reset_layout();
        self.particles.clear();
        true
    }

    /// Seat this peer in a room. A snapshot from a match already under way is resumed in
    /// place; anything else starts the ready handshake.
    pub fn join_room(&mut self, player_index: u8, seed: Option<&StateSnapshot>) -> bool {
        match seed {
            Some(snap)
                if matches!(
                    snap.phase,
                    GamePhase::Playing | GamePhase::Celebrating | GamePhase::GameOver
                ) =>
            {
                self.assign_roles(player_index);
                self.apply_snapshot(snap);
                tracing::info!(player_index, phase = ?snap.phase, "resumed match in progress");
                true
            }
            _ => self.enter_waiting_room(player_index),
        }
    }

    /// Kick off a two-car match from the kickoff layout.
    pub fn start_match(&mut self) -> bool {
        if !self.state.transition(GamePhase::Playing) {
            return false;
        }
        self.active_cars = 2;
        self.state.reset_scores();
        self.reset_layout();
        self.particles.clear();
        tracing::info!(authority = ?self.authority, "match started");
        true
    }

    /// The other peer went away mid-match: keep playing alone.
    pub fn fall_back_to_practice(&mut self) -> bool {
        if !self.state.transition(GamePhase::Practice) {
            return false;
        }
        tracing::info!("opponent left, falling back to practice");
        self.go_solo();
        true
    }

    pub fn return_to_title(&mut self) {
        self.state.mirror(GamePhase::Title);
        self.go_solo();
    }

    /// Leave the game-over screen for a fresh ready handshake.
    pub fn rematch(&mut self) -> bool {
        if !self.state.game_over() {
            return false;
        }
        self.state.transition(GamePhase::WaitingRoom);
        self.state.reset_scores();
        self.state.ready = [false; 2];
        self.reset_layout();
        true
    }

    /// Record a ready flag. Returns true once both players are ready.
    pub fn set_ready(&mut self, index: usize, ready: bool) -> bool {
        if let Some(flag) = self.state.ready.get_mut(index) {
            *flag = ready;
        }
        self.state.both_ready()
    }

    /// Latest relayed input for a remotely controlled car. Ignored for the local car.
    pub fn set_remote_input(&mut self, index: usize, input: InputSnapshot) {
        if let Some(control) = self.controls.get_mut(index) {
            if !control.is_local() {
                *control = ControlSource::RemoteRelay(input);
            }
        }
    }

    /// Host: push a snapshot after this tick?
    pub fn should_push_state(&self, report: &TickReport) -> bool {
        if self.authority != Authority::Host || self.state.phase == GamePhase::Title {
            return false;
        }
        report.goal.is_some() || report.celebration_finished || !self.state.celebrating()
    }

    /// Advance one frame.
    pub fn tick(&mut self, local_input: &InputSnapshot) -> TickReport {
        let report = match self.authority {
            Authority::Guest => {
                self.predict(local_input);
                TickReport::default()
            }
            Authority::Local | Authority::Host => {
                if self.state.phase.is_live() {
                    self.simulate(local_input)
                } else if self.state.celebrating() {
                    self.celebrate_frame()
                } else {
                    TickReport::default()
                }
            }
        };
        self.particles.update();
        self.particles.update_confetti();
        report
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let car = |v: &Vehicle| CarWire {
            x: v.pos.x,
            y: v.pos.y,
            vx: v.vel.x,
            vy: v.vel.y,
            heading: v.heading,
        };
        StateSnapshot {
            ball: BallWire {
                x: self.ball.pos.x,
                y: self.ball.pos.y,
                vx: self.ball.vel.x,
                vy: self.ball.vel.y,
            },
            player1: car(&self.cars[0]),
            player2: car(&self.cars[1]),
            score_p1: self.state.score_p1,
            score_p2: self.state.score_p2,
            celebrating: self.state.celebrating(),
            game_over: self.state.game_over(),
            winner: self.state.winner,
            ready: self.state.ready,
            phase: self.state.phase,
        }
    }

    /// Overwrite local state with an authoritative snapshot. Last write wins.
    pub fn apply_snapshot(&mut self, snap: &StateSnapshot) {
        let was_celebrating = self.state.celebrating();

        self.ball.pos = Vec2::new(snap.ball.x, snap.ball.y);
        self.ball.vel = Vec2::new(snap.ball.vx, snap.ball.vy);
        for (car, wire) in self.cars.iter_mut().zip([&snap.player1, &snap.player2]) {
            car.pos = Vec2::new(wire.x, wire.y);
            car.vel = Vec2::new(wire.vx, wire.vy);
            car.heading = wire.heading;
        }

        self.state.score_p1 = snap.score_p1;
        self.state.score_p2 = snap.score_p2;
        self.state.winner = snap.winner;
        self.state.ready = snap.ready;
        self.state.mirror(snap.phase);
        if matches!(snap.phase, GamePhase::Playing | GamePhase::Celebrating | GamePhase::GameOver) {
            self.active_cars = 2;
        }

        if !was_celebrating && self.state.celebrating() {
            let count = self.config.rules.confetti_count;
            self.particles
                .emit_confetti(self.ball.pos, count, &mut self.rng);
        }
    }

    fn go_solo(&mut self) {
        self.authority = Authority::Local;
        self.local_index = 0;
        self.active_cars = 1;
        self.controls = [
            ControlSource::LocalKeyboard,
            ControlSource::RemoteRelay(InputSnapshot::default()),
        ];
        self.state.reset_scores();
        self.state.ready = [false; 2];
        self.reset_layout();
        self.particles.clear();
    }

    fn assign_roles(&mut self, player_index: u8) {
        let local = usize::from(player_index.min(1));
        self.local_index = local;
        self.authority = if local == 0 {
            Authority::Host
        } else {
            Authority::Guest
        };
        self.active_cars = 2;
        self.controls = [
            ControlSource::RemoteRelay(InputSnapshot::default()),
            ControlSource::RemoteRelay(InputSnapshot::default()),
        ];
        self.controls[local] = ControlSource::LocalKeyboard;
        tracing::debug!(player_index, authority = ?self.authority, "roles assigned");
    }

    fn reset_layout(&mut self) {
        let field = &self.config.field;
        self.ball.reset(field);
        let [p1, p2] = field.match_spawns();
        if self.active_cars == 1 {
            let (pos, heading) = field.practice_spawn();
            self.cars[0].place(pos, heading);
        } else {
            self.cars[0].place(p1.0, p1.1);
        }
        self.cars[1].place(p2.0, p2.1);
    }

    fn simulate(&mut self, local_input: &InputSnapshot) -> TickReport {
        let cfg = self.config;
        let active = self.active_cars;

        for i in 0..active {
            let input = self.controls[i].resolve(local_input);
            self.cars[i].step(&input, &cfg.car, &cfg.field, &mut self.particles, &mut self.rng);
        }
        self.ball.step(&cfg.ball, &cfg.field);

        let mut hits = Vec::with_capacity(active);
        for (i, car) in self.cars[..active].iter().enumerate() {
            if collision::resolve_car_ball(car, &mut self.ball, &cfg.car, &cfg.collision) {
                hits.push(i);
            }
        }
        collision::apply_multi_hit_recoil(&mut self.cars[..active], &hits, &self.ball, &cfg.collision);
        collision::resolve_car_collisions(&mut self.cars[..active], &cfg.car, &cfg.collision);

        let mut report = TickReport::default();
        if let Some(side) = detect_goal(&self.ball, &cfg.field) {
            if self.state.record_goal(side) {
                tracing::info!(
                    ?side,
                    score_p1 = self.state.score_p1,
                    score_p2 = self.state.score_p2,
                    "goal"
                );
                self.launch(side);
                report.goal = Some(side);
            }
        }
        report
    }

    /// Confetti plus a kick for every car away from the goal that was scored on.
    fn launch(&mut self, side: GoalSide) {
        let rules = self.config.rules;
        self.particles
            .emit_confetti(self.ball.pos, rules.confetti_count, &mut self.rng);
        self.ball.vel = Vec2::ZERO;
        for car in self.cars[..self.active_cars].iter_mut() {
            let vy = self.rng.gen_range(-rules.launch_spread..=rules.launch_spread);
            car.vel = Vec2::new(side.away() * rules.launch_speed, vy);
        }
    }

    fn celebrate_frame(&mut self) -> TickReport {
        let rules = self.config.rules;
        for car in self.cars[..self.active_cars].iter_mut() {
            car.coast(rules.celebration_damping, &self.config.car, &self.config.field);
        }

        let mut report = TickReport::default();
        if let Some(next) = self.state.advance_celebration(&rules) {
            tracing::debug!(?next, "celebration finished");
            self.reset_layout();
            report.celebration_finished = true;
        }
        report
    }

    fn predict(&mut self, local_input: &InputSnapshot) {
        if !self.predict_local || !self.state.phase.is_live() {
            return;
        }
        let cfg = self.config;
        let car = &mut self.cars[self.local_index];
        car.step(local_input, &cfg.car, &cfg.field, &mut self.particles, &mut self.rng);
    }
}

//! Score keeping and the game phase state machine.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ball::Ball;
use crate::config::{FieldConfig, RulesConfig};

/// Where the local game currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Title,
    Practice,
    WaitingRoom,
    Playing,
    Celebrating,
    GameOver,
}

impl GamePhase {
    /// Transition table. Same-phase moves are not listed here; callers treat them as no-ops.
    pub fn can_transition(self, to: GamePhase) -> bool {
        use GamePhase::*;
        matches!(
            (self, to),
            (Title, Practice)
                | (Title, WaitingRoom)
                | (Practice, Celebrating)
                | (Practice, WaitingRoom)
                | (Practice, Playing)
                | (Practice, Title)
                | (WaitingRoom, Playing)
                | (WaitingRoom, Practice)
                | (WaitingRoom, Title)
                | (Playing, Celebrating)
                | (Playing, Practice)
                | (Playing, WaitingRoom)
                | (Playing, Title)
                | (Celebrating, Playing)
                | (Celebrating, Practice)
                | (Celebrating, GameOver)
                | (Celebrating, WaitingRoom)
                | (Celebrating, Title)
                | (GameOver, WaitingRoom)
                | (GameOver, Practice)
                | (GameOver, Title)
        )
    }

    /// Phases in which cars are driven and the ball can score.
    pub fn is_live(self) -> bool {
        matches!(self, GamePhase::Practice | GamePhase::Playing)
    }
}

/// Which goal the ball entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSide {
    Left,
    Right,
}

impl GoalSide {
    /// Index of the player credited: the left goal belongs to player 1, so player 2 scores.
    pub fn scorer(self) -> usize {
        match self {
            GoalSide::Left => 1,
            GoalSide::Right => 0,
        }
    }

    /// Horizontal direction pointing away from the goal that was scored on.
    pub fn away(self) -> f64 {
        match self {
            GoalSide::Left => 1.0,
            GoalSide::Right => -1.0,
        }
    }
}

/// Ball's leading edge past a goal line while inside the mouth.
pub fn detect_goal(ball: &Ball, field: &FieldConfig) -> Option<GoalSide> {
    if !field.in_goal_mouth(ball.pos.y) {
        return None;
    }
    if ball.pos.x - ball.radius < field.min_x() {
        Some(GoalSide::Left)
    } else if ball.pos.x + ball.radius > field.max_x() {
        Some(GoalSide::Right)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    pub phase: GamePhase,
    pub score_p1: u32,
    pub score_p2: u32,
    pub celebrate_timer_ms: f64,
    pub winner: Option<u8>,
    pub ready: [bool; 2],
    /// Phase to return to after a celebration
    resume: GamePhase,
}

impl Default for MatchState {
    fn default() -> Self {
        Self {
            phase: GamePhase::Title,
            score_p1: 0,
            score_p2: 0,
            celebrate_timer_ms: 0.0,
            winner: None,
            ready: [false; 2],
            resume: GamePhase::Playing,
        }
    }
}

impl MatchState {
    pub fn celebrating(&self) -> bool {
        self.phase == GamePhase::Celebrating
    }

    pub fn game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn scores(&self) -> [u32; 2] {
        [self.score_p1, self.score_p2]
    }

    pub fn both_ready(&self) -> bool {
        self.ready.iter().all(|r| *r)
    }

    /// Move to `to` if the table allows it. Returns false (and leaves the phase alone)
    /// for an illegal move.
    pub fn transition(&mut self, to: GamePhase) -> bool {
        if self.phase == to {
            return true;
        }
        if !self.phase.can_transition(to) {
            tracing::warn!(from = ?self.phase, ?to, "rejected phase transition");
            return false;
        }
        tracing::debug!(from = ?self.phase, ?to, "phase transition");
        self.phase = to;
        true
    }

    /// Overwrite the phase without consulting the table (replicated state).
    /// Replicated celebrations and game-over screens only ever come from a match.
    pub fn mirror(&mut self, phase: GamePhase) {
        self.phase = phase;
        match phase {
            GamePhase::Practice | GamePhase::Playing => self.resume = phase,
            GamePhase::Celebrating | GamePhase::GameOver => self.resume = GamePhase::Playing,
            GamePhase::Title | GamePhase::WaitingRoom => {}
        }
    }

    pub fn reset_scores(&mut self) {
        self.score_p1 = 0;
        self.score_p2 = 0;
        self.celebrate_timer_ms = 0.0;
        self.winner = None;
    }

    /// Credit a goal and start celebrating. Ignored unless the ball is live, so a ball
    /// sitting in the net cannot score twice.
    pub fn record_goal(&mut self, side: GoalSide) -> bool {
        if !self.phase.is_live() {
            return false;
        }
        match side.scorer() {
            0 => self.score_p1 += 1,
            _ => self.score_p2 += 1,
        }
        self.resume = self.phase;
        self.celebrate_timer_ms = 0.0;
        self.transition(GamePhase::Celebrating)
    }

    /// Advance the celebration clock by one frame. Returns the phase entered when the
    /// celebration ends.
    pub fn advance_celebration(&mut self, rules: &RulesConfig) -> Option<GamePhase> {
        if !self.celebrating() {
            return None;
        }
        self.celebrate_timer_ms += rules.frame_ms;
        if self.celebrate_timer_ms < rules.celebration_ms {
            return None;
        }

        self.celebrate_timer_ms = 0.0;
        let next = if self.resume == GamePhase::Playing {
            match self.leader_at(rules.win_score) {
                Some(winner) => {
                    self.winner = Some(winner);
                    self.ready = [false; 2];
                    GamePhase::GameOver
                }
                None => GamePhase::Playing,
            }
        } else {
            self.resume
        };
        self.transition(next);
        Some(next)
    }

    fn leader_at(&self, win_score: u32) -> Option<u8> {
        if self.score_p1 >= win_score {
            Some(0)
        } else if self.score_p2 >= win_score {
            Some(1)
        } else {
            None
        }
    }
}

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::GameConfig;
use crate::input::InputSnapshot;
use crate::match_state::GamePhase;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "joinAck")]
    JoinAck(JoinAckMsg),
    #[serde(rename = "playerJoined")]
    PlayerJoined(MembershipMsg),
    #[serde(rename = "playerLeft")]
    PlayerLeft(MembershipMsg),
    #[serde(rename = "playerInput")]
    PlayerInput(PlayerInputMsg),
    #[serde(rename = "playerReady")]
    PlayerReady(PlayerReadyMsg),
    #[serde(rename = "gameStarted")]
    GameStarted,
    #[serde(rename = "stateUpdate")]
    StateUpdate(StateUpdateMsg),
    #[serde(rename = "roomFull")]
    RoomFull(NoticeMsg),
    #[serde(rename = "error")]
    Error(NoticeMsg),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct JoinAckMsg {
    pub protocol_version: u32,
    /// 0 is the host, 1 the guest
    pub player_index: u8,
    pub room_id: String,
    /// Last state the host pushed to this room, if any
    #[serde(default)]
    pub game_state: Option<StateSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MembershipMsg {
    pub total_players: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerInputMsg {
    pub player_index: u8,
    pub input: InputSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerReadyMsg {
    pub player_index: u8,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct StateUpdateMsg {
    pub state: StateSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct NoticeMsg {
    pub message: String,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Enter a room, or create one when `roomId` is missing.
    #[serde(rename = "join")]
    Join {
        #[serde(rename = "roomId", default)]
        room_id: Option<String>,
    },
    #[serde(rename = "input")]
    Input { input: InputSnapshot },
    #[serde(rename = "playerReady")]
    PlayerReady { ready: bool },
    #[serde(rename = "startGame")]
    StartGame,
    #[serde(rename = "gameState")]
    GameState { state: StateSnapshot },
}

// === Snapshot ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct BallWire {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct CarWire {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub heading: f64,
}

/// Complete authoritative match state. Each snapshot replaces the previous one outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub ball: BallWire,
    pub player1: CarWire,
    pub player2: CarWire,
    pub score_p1: u32,
    pub score_p2: u32,
    pub celebrating: bool,
    pub game_over: bool,
    #[serde(default)]
    pub winner: Option<u8>,
    #[serde(default)]
    pub ready: [bool; 2],
    pub phase: GamePhase,
}

impl StateSnapshot {
    /// Kickoff layout with zero scores, used to seed a fresh room.
    pub fn kickoff(config: &GameConfig) -> Self {
        let center = config.field.center();
        let car = |(pos, heading): (crate::vec2::Vec2, f64)| CarWire {
            x: pos.x,
            y: pos.y,
            vx: 0.0,
            vy: 0.0,
            heading,
        };
        let [p1, p2] = config.field.match_spawns();
        Self {
            ball: BallWire {
                x: center.x,
                y: center.y,
                vx: 0.0,
                vy: 0.0,
            },
            player1: car(p1),
            player2: car(p2),
            score_p1: 0,
            score_p2: 0,
            celebrating: false,
            game_over: false,
            winner: None,
            ready: [false; 2],
            phase: GamePhase::WaitingRoom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_without_room_id_parses() {
        let parsed: ClientMsg = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert_eq!(parsed, ClientMsg::Join { room_id: None });

        let parsed: ClientMsg =
            serde_json::from_str(r#"{"type":"join","roomId":"ABC123"}"#).unwrap();
        assert_eq!(
            parsed,
            ClientMsg::Join {
                room_id: Some("ABC123".to_string())
            }
        );
    }

    #[test]
    fn input_with_partial_flags_parses() {
        let parsed: ClientMsg =
            serde_json::from_str(r#"{"type":"input","input":{"left":true}}"#).unwrap();
        match parsed {
            ClientMsg::Input { input } => {
                assert!(input.left);
                assert!(!input.forward);
            }
            _ => panic!("Expected Input"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
    }

    #[test]
    fn join_ack_uses_camel_case() {
        let msg = ServerMsg::JoinAck(JoinAckMsg {
            protocol_version: PROTOCOL_VERSION,
            player_index: 1,
            room_id: "ROOM".to_string(),
            game_state: Some(StateSnapshot::kickoff(&GameConfig::default())),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"joinAck\""));
        assert!(json.contains("\"playerIndex\":1"));
        assert!(json.contains("\"roomId\":\"ROOM\""));
        assert!(json.contains("\"scoreP1\":0"));
        assert!(json.contains("\"gameOver\":false"));
        assert!(json.contains("\"phase\":\"waitingRoom\""));
    }

    #[test]
    fn unit_variants_carry_only_the_tag() {
        let json = serde_json::to_string(&ServerMsg::GameStarted).unwrap();
        assert_eq!(json, r#"{"type":"gameStarted"}"#);
        let parsed: ClientMsg = serde_json::from_str(r#"{"type":"startGame"}"#).unwrap();
        assert_eq!(parsed, ClientMsg::StartGame);
    }

    #[test]
    fn kickoff_places_cars_on_their_spawns() {
        let snap = StateSnapshot::kickoff(&GameConfig::default());
        assert_eq!((snap.player1.x, snap.player1.y), (100.0, 300.0));
        assert_eq!((snap.player2.x, snap.player2.y), (700.0, 300.0));
        assert_eq!((snap.ball.x, snap.ball.y), (400.0, 300.0));
    }
}

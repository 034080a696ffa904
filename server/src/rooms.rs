//! Room membership bookkeeping.
//!
//! The registry never touches a socket: every operation returns the messages it wants
//! delivered and the relay task does the sending.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use carball_shared::config::GameConfig;
use carball_shared::protocol::{
    ClientMsg, JoinAckMsg, MembershipMsg, NoticeMsg, PlayerInputMsg, PlayerReadyMsg, ServerMsg,
    StateSnapshot, StateUpdateMsg, PROTOCOL_VERSION,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::config::ServerConfig;

pub type PeerId = u64;

/// Peers per room
pub const ROOM_CAPACITY: usize = 2;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A message addressed to one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: PeerId,
    pub msg: ServerMsg,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Room {0} is full")]
    RoomFull(String),
    #[error("Invalid room id")]
    InvalidRoomId,
}

impl JoinError {
    fn into_msg(self) -> ServerMsg {
        let message = self.to_string();
        match self {
            JoinError::RoomFull(_) => ServerMsg::RoomFull(NoticeMsg { message }),
            JoinError::InvalidRoomId => ServerMsg::Error(NoticeMsg { message }),
        }
    }
}

#[derive(Debug)]
struct Room {
    slots: [Option<PeerId>; ROOM_CAPACITY],
    last_activity: Instant,
    /// Last snapshot pushed by the host (or the kickoff layout)
    snapshot: StateSnapshot,
}

impl Room {
    fn new(now: Instant) -> Self {
        Self {
            slots: [None; ROOM_CAPACITY],
            last_activity: now,
            snapshot: StateSnapshot::kickoff(&GameConfig::default()),
        }
    }

    fn members(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.slots.iter().flatten().copied()
    }

    fn len(&self) -> usize {
        self.members().count()
    }

    fn slot_of(&self, peer: PeerId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(peer))
    }

    fn to_all(&self, msg: ServerMsg) -> Vec<Delivery> {
        self.members()
            .map(|to| Delivery {
                to,
                msg: msg.clone(),
            })
            .collect()
    }

    fn to_others(&self, from: PeerId, msg: ServerMsg) -> Vec<Delivery> {
        self.members()
            .filter(|p| *p != from)
            .map(|to| Delivery {
                to,
                msg: msg.clone(),
            })
            .collect()
    }
}

pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    /// Which room each peer is in
    membership: HashMap<PeerId, String>,
    next_peer_id: PeerId,
    idle_timeout: Duration,
    max_room_id_len: usize,
    room_code_len: usize,
    rng: ChaCha8Rng,
}

impl RoomRegistry {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            membership: HashMap::new(),
            next_peer_id: 1,
            idle_timeout: config.room_idle_timeout(),
            max_room_id_len: config.max_room_id_len,
            room_code_len: config.room_code_len,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Allocate an id for a new connection.
    pub fn connect(&mut self) -> PeerId {
        let id = self.next_peer_id;
        self.next_peer_id += 1;
        id
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_of(&self, peer: PeerId) -> Option<&str> {
        self.membership.get(&peer).map(String::as_str)
    }

    pub fn members(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, Room::len)
    }

    /// Dispatch one parsed client message.
    pub fn handle(&mut self, peer: PeerId, msg: ClientMsg, now: Instant) -> Vec<Delivery> {
        if let ClientMsg::Join { room_id } = msg {
            return match self.join(peer, room_id, now) {
                Ok(out) => out,
                Err(e) => {
                    tracing::info!(peer, error = %e, "join rejected");
                    vec![Delivery {
                        to: peer,
                        msg: e.into_msg(),
                    }]
                }
            };
        }

        let Some(room_id) = self.membership.get(&peer) else {
            tracing::debug!(peer, "message from peer outside any room ignored");
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        let Some(slot) = room.slot_of(peer) else {
            return Vec::new();
        };
        room.last_activity = now;
        let player_index = slot as u8;

        match msg {
            ClientMsg::Join { .. } => Vec::new(),
            ClientMsg::Input { input } => room.to_others(
                peer,
                ServerMsg::PlayerInput(PlayerInputMsg {
                    player_index,
                    input,
                }),
            ),
            ClientMsg::PlayerReady { ready } => {
                room.snapshot.ready[slot] = ready;
                room.to_all(ServerMsg::PlayerReady(PlayerReadyMsg {
                    player_index,
                    ready,
                }))
            }
            ClientMsg::StartGame if slot == 0 => room.to_others(peer, ServerMsg::GameStarted),
            ClientMsg::GameState { state } if slot == 0 => {
                room.snapshot = state.clone();
                room.to_others(peer, ServerMsg::StateUpdate(StateUpdateMsg { state }))
            }
            ClientMsg::StartGame | ClientMsg::GameState { .. } => {
                tracing::debug!(peer, slot, "host-only message from guest ignored");
                Vec::new()
            }
        }
    }

    /// Put `peer` into a room, creating it when needed. An empty or missing id asks for
    /// a generated code.
    pub fn join(
        &mut self,
        peer: PeerId,
        room_id: Option<String>,
        now: Instant,
    ) -> Result<Vec<Delivery>, JoinError> {
        let room_id = match room_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                self.validate_room_id(&id)?;
                id
            }
            None => self.generate_code(),
        };

        let already_here = self.room_of(peer) == Some(room_id.as_str());
        if !already_here && self.members(&room_id) >= ROOM_CAPACITY {
            return Err(JoinError::RoomFull(room_id));
        }

        let mut out = self.leave(peer);

        let room = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::info!(room = %room_id, "room created");
                Room::new(now)
            });
        let Some(slot) = room.slots.iter().position(Option::is_none) else {
            return Err(JoinError::RoomFull(room_id));
        };
        room.slots[slot] = Some(peer);
        room.last_activity = now;
        self.membership.insert(peer, room_id.clone());

        let total = room.len();
        tracing::info!(room = %room_id, peer, slot, total, "peer joined");

        out.push(Delivery {
            to: peer,
            msg: ServerMsg::JoinAck(JoinAckMsg {
                protocol_version: PROTOCOL_VERSION,
                player_index: slot as u8,
                room_id: room_id.clone(),
                game_state: Some(room.snapshot.clone()),
            }),
        });
        out.extend(room.to_all(ServerMsg::PlayerJoined(MembershipMsg {
            total_players: total as u32,
        })));
        Ok(out)
    }

    /// Remove `peer` from whatever room it is in. Empty rooms are deleted; the remaining
    /// peer hears about the departure.
    pub fn leave(&mut self, peer: PeerId) -> Vec<Delivery> {
        let Some(room_id) = self.membership.remove(&peer) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        if let Some(slot) = room.slot_of(peer) {
            room.slots[slot] = None;
            room.snapshot.ready[slot] = false;
        }

        let total = room.len();
        tracing::info!(room = %room_id, peer, total, "peer left");
        if total == 0 {
            self.rooms.remove(&room_id);
            tracing::info!(room = %room_id, "room deleted");
            return Vec::new();
        }
        room.to_all(ServerMsg::PlayerLeft(MembershipMsg {
            total_players: total as u32,
        }))
    }

    /// Connection closed.
    pub fn disconnect(&mut self, peer: PeerId) -> Vec<Delivery> {
        self.leave(peer)
    }

    /// Close rooms idle for longer than the timeout. Their peers get an error and are no
    /// longer members of anything.
    pub fn sweep(&mut self, now: Instant) -> Vec<Delivery> {
        let timeout = self.idle_timeout;
        let stale: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| now.saturating_duration_since(room.last_activity) > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        let mut out = Vec::new();
        for id in stale {
            let Some(room) = self.rooms.remove(&id) else {
                continue;
            };
            tracing::info!(room = %id, members = room.len(), "idle room swept");
            for peer in room.members() {
                self.membership.remove(&peer);
                out.push(Delivery {
                    to: peer,
                    msg: ServerMsg::Error(NoticeMsg {
                        message: format!("Room {id} closed after inactivity"),
                    }),
                });
            }
        }
        out
    }

    fn validate_room_id(&self, id: &str) -> Result<(), JoinError> {
        let ok = id.len() <= self.max_room_id_len
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if ok {
            Ok(())
        } else {
            Err(JoinError::InvalidRoomId)
        }
    }

    fn generate_code(&mut self) -> String {
        loop {
            let code: String = (0..self.room_code_len)
                .map(|_| {
                    let i = self.rng.gen_range(0..CODE_ALPHABET.len());
                    CODE_ALPHABET[i] as char
                })
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

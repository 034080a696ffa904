//! Network session: drives a [`MatchContext`] from relay traffic and decides what to send.
//!
//! The session never touches a socket. Incoming [`NetEvent`]s go through
//! [`NetSession::handle_event`], the frame loop calls [`NetSession::tick`], and whatever the
//! peer has to say ends up in an outbox the caller drains into the connection.

use carball_shared::input::InputSnapshot;
use carball_shared::match_state::GamePhase;
use carball_shared::protocol::{ClientMsg, ServerMsg};
use carball_shared::sim::{Authority, MatchContext, TickReport};

use crate::connection::NetEvent;

/// Guest input cadence.
pub const INPUT_INTERVAL_MS: f64 = 50.0;

pub struct NetSession {
    ctx: MatchContext,
    room: Option<String>,
    player_index: Option<u8>,
    peers: u32,
    online: bool,
    since_input_ms: f64,
    outbox: Vec<ClientMsg>,
}

impl NetSession {
    /// `room` of `None` asks the relay for a fresh room code on the first join.
    pub fn new(ctx: MatchContext, room: Option<String>) -> Self {
        Self {
            ctx,
            room,
            player_index: None,
            peers: 0,
            online: false,
            since_input_ms: 0.0,
            outbox: Vec::new(),
        }
    }

    pub fn ctx(&self) -> &MatchContext {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut MatchContext {
        &mut self.ctx
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn player_index(&self) -> Option<u8> {
        self.player_index
    }

    pub fn peers(&self) -> u32 {
        self.peers
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Messages produced since the last call, oldest first.
    pub fn take_outbox(&mut self) -> Vec<ClientMsg> {
        std::mem::take(&mut self.outbox)
    }

    pub fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected => {
                self.online = true;
                self.outbox.push(ClientMsg::Join {
                    room_id: self.room.clone(),
                });
            }
            NetEvent::Disconnected => {
                self.online = false;
                self.player_index = None;
                self.peers = 0;
                if self.in_room_phase() {
                    self.ctx.fall_back_to_practice();
                }
            }
            NetEvent::ProtocolMismatch { server, client } => {
                tracing::error!(server, client, "server speaks a different protocol version");
                self.online = false;
            }
            NetEvent::Message(msg) => self.handle_server(msg),
        }
    }

    /// Ask to (un)ready. From the game-over screen this also starts the rematch handshake.
    pub fn set_ready(&mut self, ready: bool) -> bool {
        let Some(index) = self.player_index else {
            return false;
        };
        if self.ctx.phase() == GamePhase::GameOver {
            self.ctx.rematch();
        }
        if self.ctx.phase() != GamePhase::WaitingRoom {
            return false;
        }
        self.ctx.set_ready(usize::from(index), ready);
        self.outbox.push(ClientMsg::PlayerReady { ready });
        self.maybe_start();
        true
    }

    /// Advance one frame and queue whatever this peer owes the room.
    pub fn tick(&mut self, input: &InputSnapshot) -> TickReport {
        let report = self.ctx.tick(input);
        if !self.online || self.player_index.is_none() {
            return report;
        }

        match self.ctx.authority() {
            Authority::Host => {
                if self.ctx.should_push_state(&report) {
                    self.outbox.push(ClientMsg::GameState {
                        state: self.ctx.snapshot(),
                    });
                }
            }
            Authority::Guest => {
                if matches!(self.ctx.phase(), GamePhase::Playing | GamePhase::Celebrating) {
                    self.since_input_ms += self.ctx.config.rules.frame_ms;
                    if self.since_input_ms >= INPUT_INTERVAL_MS {
                        self.since_input_ms -= INPUT_INTERVAL_MS;
                        self.outbox.push(ClientMsg::Input { input: *input });
                    }
                } else {
                    self.since_input_ms = 0.0;
                }
            }
            Authority::Local => {}
        }
        report
    }

    fn handle_server(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::JoinAck(ack) => {
                tracing::info!(
                    room = %ack.room_id,
                    player_index = ack.player_index,
                    "joined room"
                );
                self.player_index = Some(ack.player_index);
                self.room = Some(ack.room_id);
                self.since_input_ms = 0.0;
                self.ctx.join_room(ack.player_index, ack.game_state.as_ref());
            }
            ServerMsg::PlayerJoined(m) => {
                self.peers = m.total_players;
                if m.total_players >= 2 && self.ctx.phase() == GamePhase::Practice {
                    if let Some(index) = self.player_index {
                        self.ctx.enter_waiting_room(index);
                    }
                }
            }
            ServerMsg::PlayerLeft(m) => {
                self.peers = m.total_players;
                if self.player_index.is_some() {
                    // Whoever takes the free slot has to ready up again
                    let other = 1 - self.ctx.local_index();
                    self.ctx.set_ready(other, false);
                }
                if m.total_players < 2
                    && matches!(self.ctx.phase(), GamePhase::Playing | GamePhase::Celebrating)
                {
                    self.ctx.fall_back_to_practice();
                }
            }
            ServerMsg::PlayerInput(m) => {
                if Some(m.player_index) != self.player_index {
                    self.ctx.set_remote_input(usize::from(m.player_index), m.input);
                }
            }
            ServerMsg::PlayerReady(m) => {
                if self.ctx.phase() == GamePhase::GameOver {
                    self.ctx.rematch();
                }
                self.ctx.set_ready(usize::from(m.player_index), m.ready);
                self.maybe_start();
            }
            ServerMsg::GameStarted => {
                if self.ctx.authority() == Authority::Guest {
                    self.ctx.start_match();
                }
            }
            ServerMsg::StateUpdate(u) => {
                if self.ctx.authority() == Authority::Guest {
                    self.ctx.apply_snapshot(&u.state);
                }
            }
            ServerMsg::RoomFull(notice) => {
                tracing::warn!(message = %notice.message, "room full");
            }
            ServerMsg::Error(notice) => {
                tracing::warn!(message = %notice.message, "relay error");
            }
        }
    }

    /// Host only: both flags set in the waiting room starts the match everywhere.
    fn maybe_start(&mut self) {
        if self.ctx.authority() == Authority::Host
            && self.ctx.phase() == GamePhase::WaitingRoom
            && self.ctx.state.both_ready()
            && self.ctx.start_match()
        {
            self.outbox.push(ClientMsg::StartGame);
        }
    }

    fn in_room_phase(&self) -> bool {
        matches!(
            self.ctx.phase(),
            GamePhase::WaitingRoom | GamePhase::Playing | GamePhase::Celebrating | GamePhase::GameOver
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carball_shared::config::GameConfig;
    use carball_shared::input::ControlSource;
    use carball_shared::protocol::{
        JoinAckMsg, MembershipMsg, PlayerInputMsg, PlayerReadyMsg, StateSnapshot, StateUpdateMsg,
        PROTOCOL_VERSION,
    };

    fn session(room: Option<&str>) -> NetSession {
        let mut ctx = MatchContext::new(GameConfig::default(), 9);
        ctx.start_practice();
        NetSession::new(ctx, room.map(str::to_string))
    }

    fn ack(index: u8, room: &str) -> NetEvent {
        NetEvent::Message(ServerMsg::JoinAck(JoinAckMsg {
            protocol_version: PROTOCOL_VERSION,
            player_index: index,
            room_id: room.to_string(),
            game_state: Some(StateSnapshot::kickoff(&GameConfig::default())),
        }))
    }

    fn joined(total: u32) -> NetEvent {
        NetEvent::Message(ServerMsg::PlayerJoined(MembershipMsg {
            total_players: total,
        }))
    }

    fn seated(index: u8) -> NetSession {
        let mut s = session(Some("ROOM"));
        s.handle_event(NetEvent::Connected);
        s.handle_event(ack(index, "ROOM"));
        s.handle_event(joined(2));
        s.take_outbox();
        s
    }

    fn playing_host() -> NetSession {
        let mut s = seated(0);
        s.set_ready(true);
        s.handle_event(NetEvent::Message(ServerMsg::PlayerReady(PlayerReadyMsg {
            player_index: 1,
            ready: true,
        })));
        s.take_outbox();
        assert_eq!(s.ctx().phase(), GamePhase::Playing);
        s
    }

    #[test]
    fn connecting_sends_join_for_room() {
        let mut s = session(Some("ABC"));
        s.handle_event(NetEvent::Connected);
        assert_eq!(
            s.take_outbox(),
            vec![ClientMsg::Join {
                room_id: Some("ABC".to_string())
            }]
        );
    }

    #[test]
    fn generated_room_code_is_reused_on_reconnect() {
        let mut s = session(None);
        s.handle_event(NetEvent::Connected);
        assert_eq!(s.take_outbox(), vec![ClientMsg::Join { room_id: None }]);

        s.handle_event(ack(0, "K7Q2ZX"));
        assert_eq!(s.ctx().phase(), GamePhase::WaitingRoom);
        assert_eq!(s.ctx().authority(), Authority::Host);

        s.handle_event(NetEvent::Disconnected);
        assert_eq!(s.ctx().phase(), GamePhase::Practice);
        s.handle_event(NetEvent::Connected);
        assert_eq!(
            s.take_outbox(),
            vec![ClientMsg::Join {
                room_id: Some("K7Q2ZX".to_string())
            }]
        );
    }

    #[test]
    fn host_starts_match_once_both_are_ready() {
        let mut s = seated(0);
        assert!(s.set_ready(true));
        assert_eq!(s.take_outbox(), vec![ClientMsg::PlayerReady { ready: true }]);
        assert_eq!(s.ctx().phase(), GamePhase::WaitingRoom);

        s.handle_event(NetEvent::Message(ServerMsg::PlayerReady(PlayerReadyMsg {
            player_index: 1,
            ready: true,
        })));
        assert_eq!(s.ctx().phase(), GamePhase::Playing);
        assert!(s.take_outbox().contains(&ClientMsg::StartGame));
    }

    #[test]
    fn guest_waits_for_game_started() {
        let mut s = seated(1);
        s.set_ready(true);
        s.handle_event(NetEvent::Message(ServerMsg::PlayerReady(PlayerReadyMsg {
            player_index: 0,
            ready: true,
        })));
        assert_eq!(s.ctx().phase(), GamePhase::WaitingRoom);
        assert!(!s.take_outbox().contains(&ClientMsg::StartGame));

        s.handle_event(NetEvent::Message(ServerMsg::GameStarted));
        assert_eq!(s.ctx().phase(), GamePhase::Playing);
    }

    #[test]
    fn guest_sends_input_every_fifty_ms() {
        let mut s = seated(1);
        s.handle_event(NetEvent::Message(ServerMsg::GameStarted));
        let input = InputSnapshot {
            forward: true,
            ..Default::default()
        };
        for _ in 0..30 {
            s.tick(&input);
        }
        let out = s.take_outbox();
        let inputs = out
            .iter()
            .filter(|m| matches!(m, ClientMsg::Input { .. }))
            .count();
        assert_eq!(inputs, 9);
        assert!(!out.iter().any(|m| matches!(m, ClientMsg::GameState { .. })));
    }

    #[test]
    fn host_pushes_state_every_frame_while_playing() {
        let mut s = playing_host();
        s.tick(&InputSnapshot::default());
        s.tick(&InputSnapshot::default());
        let out = s.take_outbox();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| matches!(m, ClientMsg::GameState { .. })));
    }

    #[test]
    fn opponent_leaving_mid_match_falls_back_to_practice() {
        let mut s = playing_host();
        s.handle_event(NetEvent::Message(ServerMsg::PlayerLeft(MembershipMsg {
            total_players: 1,
        })));
        assert_eq!(s.ctx().phase(), GamePhase::Practice);
        assert_eq!(s.ctx().authority(), Authority::Local);
        assert_eq!(s.peers(), 1);
    }

    #[test]
    fn leaver_ready_flag_does_not_carry_over_to_next_guest() {
        let mut s = seated(0);
        s.handle_event(NetEvent::Message(ServerMsg::PlayerReady(PlayerReadyMsg {
            player_index: 1,
            ready: true,
        })));
        s.handle_event(NetEvent::Message(ServerMsg::PlayerLeft(MembershipMsg {
            total_players: 1,
        })));
        assert_eq!(s.ctx().state.ready, [false, false]);

        s.handle_event(joined(2));
        assert!(s.set_ready(true));
        assert_eq!(s.ctx().phase(), GamePhase::WaitingRoom);
        assert_eq!(s.ctx().state.ready, [true, false]);
        assert!(!s.take_outbox().contains(&ClientMsg::StartGame));
    }

    #[test]
    fn own_relayed_input_is_ignored() {
        let mut s = playing_host();
        let input = InputSnapshot {
            back: true,
            ..Default::default()
        };
        for index in [0, 1] {
            s.handle_event(NetEvent::Message(ServerMsg::PlayerInput(PlayerInputMsg {
                player_index: index,
                input,
            })));
        }
        assert_eq!(s.ctx().controls()[0], ControlSource::LocalKeyboard);
        assert_eq!(s.ctx().controls()[1], ControlSource::RemoteRelay(input));
    }

    #[test]
    fn only_guests_apply_state_updates() {
        let mut snap = StateSnapshot::kickoff(&GameConfig::default());
        snap.phase = GamePhase::Playing;
        snap.score_p1 = 5;
        let update = || {
            NetEvent::Message(ServerMsg::StateUpdate(StateUpdateMsg {
                state: snap.clone(),
            }))
        };

        let mut host = playing_host();
        host.handle_event(update());
        assert_eq!(host.ctx().state.score_p1, 0);

        let mut guest = seated(1);
        guest.handle_event(update());
        assert_eq!(guest.ctx().state.score_p1, 5);
        assert_eq!(guest.ctx().phase(), GamePhase::Playing);
    }

    #[test]
    fn ready_on_game_over_starts_rematch() {
        let mut s = playing_host();
        s.ctx_mut().state.score_p1 = 11;
        s.ctx_mut().state.mirror(GamePhase::GameOver);

        assert!(s.set_ready(true));
        assert_eq!(s.ctx().phase(), GamePhase::WaitingRoom);
        assert_eq!(s.ctx().state.scores(), [0, 0]);
        assert_eq!(s.take_outbox(), vec![ClientMsg::PlayerReady { ready: true }]);
    }

    #[test]
    fn offline_session_queues_nothing() {
        let mut s = session(Some("ABC"));
        s.tick(&InputSnapshot::default());
        assert!(s.take_outbox().is_empty());
        assert!(!s.set_ready(true));
    }
}

use std::time::Duration;

use carball_client::autopilot::Autopilot;
use carball_client::connection::ServerConnection;
use carball_client::options::ClientOptions;
use carball_client::session::NetSession;
use carball_shared::config::GameConfig;
use carball_shared::match_state::GamePhase;
use carball_shared::sim::MatchContext;

const FRAME: Duration = Duration::from_millis(16);
/// Frames to wait before repeating an unanswered ready request.
const READY_RETRY_FRAMES: u64 = 60;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let opts = match ClientOptions::parse(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!(
                "usage: carball-client [--url ws://host:port/ws] [--room CODE] [--frames N] [--seed N] [--no-predict]"
            );
            std::process::exit(2);
        }
    };

    let config = GameConfig::default();
    if let Err(e) = config.validate() {
        eprintln!("Invalid game configuration: {}", e);
        std::process::exit(1);
    }

    let mut ctx = MatchContext::new(config, opts.seed);
    ctx.predict_local = !opts.no_predict;
    ctx.start_practice();

    let mut session = NetSession::new(ctx, opts.room.clone());
    let mut conn = ServerConnection::spawn(opts.url.clone());
    let mut pilot = Autopilot::with_seed(opts.seed as u32);
    pilot.reset();

    tracing::info!(url = %opts.url, room = ?opts.room, "starting client");

    let mut ticker = tokio::time::interval(FRAME);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut frame: u64 = 0;
    let mut last_ready_frame: Option<u64> = None;

    loop {
        ticker.tick().await;

        for event in conn.poll_events() {
            session.handle_event(event);
        }
        if conn.protocol_mismatch {
            eprintln!("Server protocol does not match this client, giving up");
            std::process::exit(1);
        }

        // Always ready up once an opponent is present
        let ctx = session.ctx();
        let phase = ctx.phase();
        if session.peers() >= 2
            && matches!(phase, GamePhase::WaitingRoom | GamePhase::GameOver)
            && !ctx.state.ready[ctx.local_index()]
            && last_ready_frame.is_none_or(|at| frame - at >= READY_RETRY_FRAMES)
            && session.set_ready(true)
        {
            last_ready_frame = Some(frame);
        }

        let input = pilot.drive_local(session.ctx());
        let report = session.tick(&input);
        if report.goal.is_some() {
            let [p1, p2] = session.ctx().state.scores();
            tracing::info!(p1, p2, "score");
        }
        if report.celebration_finished {
            pilot.reset();
            if session.ctx().phase() == GamePhase::GameOver {
                tracing::info!(winner = ?session.ctx().state.winner, "game over");
            }
        }

        for msg in session.take_outbox() {
            conn.send(msg);
        }

        frame += 1;
        if opts.frames > 0 && frame >= opts.frames {
            break;
        }
    }

    let [p1, p2] = session.ctx().state.scores();
    tracing::info!(frames = frame, p1, p2, phase = ?session.ctx().phase(), "client finished");
}

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use mafia_party_server::config::{DetectiveInsight, MatchConfig};
use mafia_party_server::constants::{HUMAN_ID, TICK_MS};
use mafia_party_server::engine::PhaseController;
use mafia_party_server::error::SignalError;
use mafia_party_server::logging::{init_logging, LogFormat};
use mafia_party_server::server_protocol::{parse_client_message, ParsedClientMessage};
use mafia_party_server::server_utils::{
    error_payload, phase_ms_from_secs, sanitize_name, skip_target,
};
use mafia_party_server::types::GameEvent;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Parser, Debug)]
#[command(name = "server", about = "WebSocket server for a single Mafia party match")]
struct ServerArgs {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Directory with the built browser client (falls back to dist/client).
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    #[arg(long, env = "MAFIA_NIGHT_SECS", default_value_t = 10)]
    night_secs: u64,

    #[arg(long, env = "MAFIA_DISCUSSION_SECS", default_value_t = 90)]
    discussion_secs: u64,

    #[arg(long, env = "MAFIA_VOTING_SECS", default_value_t = 20)]
    voting_secs: u64,

    /// Fixed seed for role deals and persona choices; random when unset.
    #[arg(long, env = "MAFIA_SEED")]
    seed: Option<u32>,

    #[arg(
        long,
        env = "MAFIA_DETECTIVE_INSIGHT",
        default_value = "omniscient",
        value_parser = parse_insight
    )]
    detective_insight: DetectiveInsight,

    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_insight(raw: &str) -> Result<DetectiveInsight, String> {
    DetectiveInsight::parse(raw)
        .ok_or_else(|| format!("unknown detective insight '{raw}' (omniscient | public)"))
}

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    participant_id: Option<String>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    active_client_by_participant: HashMap<String, String>,
    controller: PhaseController,
}

impl ServerState {
    fn new(controller: PhaseController) -> Self {
        Self {
            clients: HashMap::new(),
            active_client_by_participant: HashMap::new(),
            controller,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();
    init_logging(args.log_format, args.verbose.saturating_add(1));

    let config = MatchConfig {
        night_ms: phase_ms_from_secs(args.night_secs),
        discussion_ms: phase_ms_from_secs(args.discussion_secs),
        voting_ms: phase_ms_from_secs(args.voting_secs),
        detective_insight: args.detective_insight,
        ..MatchConfig::default()
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let controller = PhaseController::new(config, seed)?;
    info!(seed, insight = ?args.detective_insight, "match controller ready");

    let state = Arc::new(Mutex::new(ServerState::new(controller)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/state", get(state_handler))
        .route("/api/voting-history", get(voting_history_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(args.static_dir) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; only the API and /ws are served");
        app
    };

    let bind_addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(port = args.port, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn resolve_static_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.join("index.html").is_file() {
            return Some(path);
        }
        warn!(path = %path.display(), "STATIC_DIR has no index.html");
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn state_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.controller.snapshot())
}

async fn voting_history_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.controller.voting_history().to_vec())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                participant_id: None,
            },
        );
        let snapshot = snapshot_message(&guard.controller);
        send_to_client(&mut guard, &client_id, &snapshot, QueuePolicy::DisconnectOnFull);
        info!(client = %client_id, "client connected");
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    if let Err(reason) = apply_message(&mut guard, client_id, message) {
        warn!(client = client_id, %reason, "request rejected");
        send_to_client(
            &mut guard,
            client_id,
            &error_payload(&reason),
            QueuePolicy::DisconnectOnFull,
        );
    }
    flush_events(&mut guard);
}

fn apply_message(
    state: &mut ServerState,
    client_id: &str,
    message: ParsedClientMessage,
) -> Result<(), String> {
    match message {
        ParsedClientMessage::Join { name } => handle_join(state, client_id, &sanitize_name(&name)),
        ParsedClientMessage::StartGame => state.controller.start().map_err(|err| err.to_string()),
        ParsedClientMessage::NightAction { role, target } => {
            let actor = bound_participant(state, client_id)?;
            state
                .controller
                .submit_night_action(&actor, role, &target)
                .map_err(|err| err.to_string())
        }
        ParsedClientMessage::Vote { target } => {
            let voter = bound_participant(state, client_id)?;
            state
                .controller
                .submit_vote(&voter, &target)
                .map_err(|err| err.to_string())
        }
        ParsedClientMessage::SkipRound { phase } => {
            let requested = skip_target(phase, state.controller.phase());
            let skipped_by = display_name_of(state, client_id);
            state
                .controller
                .request_skip(requested, &skipped_by)
                .map_err(|err| err.to_string())
        }
        ParsedClientMessage::RestartGame => {
            state.controller.request_reset();
            broadcast_lobby(state);
            Ok(())
        }
        ParsedClientMessage::GetVotingHistory => {
            let history = json!({
                "type": "voting-history-update",
                "history": state.controller.voting_history(),
            });
            send_to_client(state, client_id, &history, QueuePolicy::DisconnectOnFull);
            Ok(())
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                state,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
            Ok(())
        }
    }
}

fn handle_join(state: &mut ServerState, client_id: &str, name: &str) -> Result<(), String> {
    let participant_id = match state.controller.seat_human(name) {
        Ok(id) => id,
        // a reloaded browser takes the running human seat back
        Err(SignalError::LobbyClosed)
            if state.controller.state().participant(HUMAN_ID).is_some() =>
        {
            HUMAN_ID.to_string()
        }
        Err(err) => return Err(err.to_string()),
    };
    bind_client_to_participant(state, client_id, &participant_id);
    info!(client = client_id, participant = %participant_id, "client joined");

    send_to_client(
        state,
        client_id,
        &json!({
            "type": "welcome",
            "playerId": participant_id,
            "name": name,
        }),
        QueuePolicy::DisconnectOnFull,
    );
    let snapshot = snapshot_message(&state.controller);
    send_to_client(state, client_id, &snapshot, QueuePolicy::DisconnectOnFull);
    broadcast_lobby(state);
    Ok(())
}

fn bound_participant(state: &ServerState, client_id: &str) -> Result<String, String> {
    state
        .clients
        .get(client_id)
        .and_then(|ctx| ctx.participant_id.clone())
        .ok_or_else(|| "send join first".to_string())
}

fn display_name_of(state: &ServerState, client_id: &str) -> String {
    state
        .clients
        .get(client_id)
        .and_then(|ctx| ctx.participant_id.as_deref())
        .and_then(|id| state.controller.state().participant(id))
        .map(|participant| participant.display_name().to_string())
        .unwrap_or_else(|| "spectator".to_string())
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    disconnect_client_internal(&mut guard, client_id);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str) {
    let Some(context) = state.clients.remove(client_id) else {
        return;
    };
    info!(client = client_id, "client disconnected");
    let Some(bound_participant_id) = context.participant_id else {
        return;
    };
    if state
        .active_client_by_participant
        .get(&bound_participant_id)
        .is_some_and(|active| active == client_id)
    {
        state
            .active_client_by_participant
            .remove(&bound_participant_id);
    }
}

fn bind_client_to_participant(state: &mut ServerState, client_id: &str, participant_id: &str) {
    if let Some(old_client_id) = state
        .active_client_by_participant
        .get(participant_id)
        .cloned()
    {
        if old_client_id != client_id {
            if let Some(old_client) = state.clients.get_mut(&old_client_id) {
                old_client.participant_id = None;
                let _ = old_client.tx.try_send(OutboundMessage::Close {
                    code: 4001,
                    reason: "superseded by new connection".to_string(),
                });
            }
        }
    }

    if let Some(ctx) = state.clients.get_mut(client_id) {
        ctx.participant_id = Some(participant_id.to_string());
    }
    state
        .active_client_by_participant
        .insert(participant_id.to_string(), client_id.to_string());
}

fn snapshot_message(controller: &PhaseController) -> Value {
    json!({
        "type": "game-state-update",
        "state": controller.snapshot(),
    })
}

fn broadcast_lobby(state: &mut ServerState) {
    let players: Vec<Value> = state
        .controller
        .state()
        .participants()
        .iter()
        .map(|participant| json!(participant.view()))
        .collect();
    let message = json!({
        "type": "lobby",
        "phase": state.controller.phase(),
        "players": players,
    });
    broadcast(state, &message, QueuePolicy::DisconnectOnFull);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            guard.controller.advance(TICK_MS);
            flush_events(&mut guard);
        }
    });
}

/// Sends every queued match event: private ones to the recipient's client only.
fn flush_events(state: &mut ServerState) {
    for event in state.controller.drain_events() {
        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(err) => {
                error!(%err, "failed to serialize match event");
                continue;
            }
        };
        let policy = if matches!(event, GameEvent::TimerUpdate { .. }) {
            QueuePolicy::DropOnFull
        } else {
            QueuePolicy::DisconnectOnFull
        };
        match event.recipient() {
            Some(recipient) => {
                let Some(client_id) = state.active_client_by_participant.get(recipient).cloned()
                else {
                    debug!(recipient, "no client bound for private event");
                    continue;
                };
                send_to_client(state, &client_id, &payload, policy);
            }
            None => broadcast(state, &payload, policy),
        }
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        warn!(client = client_id, "outbound queue full; disconnecting");
        disconnect_client_internal(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        warn!(client = %client_id, "outbound queue full; disconnecting");
        disconnect_client_internal(state, &client_id);
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &error_payload(message),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{id}")
}

use super::room::{ClientView, Room, RoomError, RoomEvent, RoomManager};
use super::store::RoomStore;
use crate::uno::{Color, PlayOutcome};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize)]
pub struct JoinResponse {
    pub player_index: usize,
    pub client_id: Uuid,
    pub state: ClientView,
}

#[derive(Deserialize)]
pub struct StateQuery {
    pub player: Option<usize>,
    pub client: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
pub struct StateResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<ClientView>,
}

#[derive(Deserialize)]
pub struct PlayRequest {
    pub player_index: usize,
    pub card_index: usize,
    pub client: Uuid,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct SeatRequest {
    pub player_index: usize,
    pub client: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct MoveResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ClientView>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_saved: bool,
}

impl MoveResponse {
    fn ok(state: ClientView, saved: bool) -> Self {
        Self {
            status: "ok".to_string(),
            state: Some(state),
            not_saved: !saved,
        }
    }

    fn needs_color() -> Self {
        Self {
            status: "needs_color".to_string(),
            state: None,
            not_saved: false,
        }
    }
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub player: Option<usize>,
    pub client: Option<Uuid>,
}

/// Events pushed to WebSocket subscribers.
#[derive(Serialize)]
struct WsEvent {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<ClientView>,
}

fn valid_room_id(room_id: &str) -> bool {
    !room_id.is_empty()
        && room_id.len() <= 64
        && room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_color(color: &str) -> Option<Color> {
    match color.to_lowercase().as_str() {
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "blue" => Some(Color::Blue),
        "yellow" => Some(Color::Yellow),
        _ => None,
    }
}

/// Room lookup for everything except join: malformed ids never reach
/// the store.
async fn lookup(state: &AppState, room_id: &str) -> Option<Arc<Mutex<Room>>> {
    if !valid_room_id(room_id) {
        return None;
    }
    state.rooms.get(room_id).await
}

/// A caller sees a seat's hand only by presenting the client id that
/// claimed it at join time; anything else is a spectator.
fn resolve_viewer(room: &Room, player: Option<usize>, client: Option<Uuid>) -> Option<usize> {
    match (player, client) {
        (Some(seat), Some(client)) if room.seat_claimed_by(seat, client) => Some(seat),
        _ => None,
    }
}

fn rejection(e: &RoomError) -> StatusCode {
    match e {
        RoomError::RoomFull | RoomError::GameInProgress | RoomError::NameTaken => {
            StatusCode::CONFLICT
        }
        RoomError::Game(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> impl IntoResponse {
    if !valid_room_id(&room_id) {
        return (StatusCode::BAD_REQUEST, "invalid room id".to_string()).into_response();
    }
    let name = req.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "a display name is required".to_string())
            .into_response();
    }

    let room = state.rooms.get_or_create(&room_id).await;
    let mut room = room.lock().await;
    let client_id = Uuid::new_v4();

    match room.claim_seat(name, client_id) {
        Ok(seat) => {
            info!(%room_id, name, seat, "player joined");
            room.touch();
            state.rooms.persist(&room_id, &room);
            room.broadcast_state();
            let response = JoinResponse {
                player_index: seat,
                client_id,
                state: ClientView::redact(&room.state, Some(seat)),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            info!(%room_id, name, error = %e, "join rejected");
            (rejection(&e), e.to_string()).into_response()
        }
    }
}

/// Polling fallback: the full redacted snapshot on demand. Unknown
/// rooms answer `exists: false` rather than an error so a client can
/// probe before joining.
pub async fn get_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<StateQuery>,
) -> impl IntoResponse {
    let Some(room) = lookup(&state, &room_id).await else {
        return Json(StateResponse {
            exists: false,
            game_state: None,
        })
        .into_response();
    };

    let room = room.lock().await;
    let viewer = resolve_viewer(&room, query.player, query.client);
    Json(StateResponse {
        exists: true,
        game_state: Some(ClientView::redact(&room.state, viewer)),
    })
    .into_response()
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    let Some(room) = lookup(&state, &room_id).await else {
        return (StatusCode::NOT_FOUND, "room not found".to_string()).into_response();
    };
    let mut room = room.lock().await;

    match room.state.start() {
        Ok(next) => {
            info!(%room_id, players = next.players.len(), "game started");
            room.state = next;
            room.touch();
            let saved = state.rooms.persist(&room_id, &room);
            room.broadcast_state();
            Json(MoveResponse::ok(ClientView::redact(&room.state, None), saved)).into_response()
        }
        Err(e) => {
            info!(%room_id, error = %e, "start rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

pub async fn play_card(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<PlayRequest>,
) -> impl IntoResponse {
    let chosen_color = match req.color.as_deref() {
        Some(raw) => match parse_color(raw) {
            Some(color) => Some(color),
            None => {
                return (StatusCode::BAD_REQUEST, "invalid color".to_string()).into_response()
            }
        },
        None => None,
    };

    let Some(room) = lookup(&state, &room_id).await else {
        return (StatusCode::NOT_FOUND, "room not found".to_string()).into_response();
    };
    let mut room = room.lock().await;
    if !room.seat_claimed_by(req.player_index, req.client) {
        return (StatusCode::FORBIDDEN, "seat not claimed by caller".to_string())
            .into_response();
    }

    match room
        .state
        .play_card(req.player_index, req.card_index, chosen_color)
    {
        Ok(PlayOutcome::Played(next)) => {
            info!(
                %room_id,
                player = req.player_index,
                card = req.card_index,
                "card played"
            );
            room.state = next;
            room.touch();
            let saved = state.rooms.persist(&room_id, &room);
            room.broadcast_state();
            Json(MoveResponse::ok(
                ClientView::redact(&room.state, Some(req.player_index)),
                saved,
            ))
            .into_response()
        }
        Ok(PlayOutcome::NeedsColor) => {
            // Two-phase wild protocol: nothing changed, the caller must
            // re-invoke with a color.
            Json(MoveResponse::needs_color()).into_response()
        }
        Err(e) => {
            info!(%room_id, player = req.player_index, error = %e, "play rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

pub async fn draw_card(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<SeatRequest>,
) -> impl IntoResponse {
    let Some(room) = lookup(&state, &room_id).await else {
        return (StatusCode::NOT_FOUND, "room not found".to_string()).into_response();
    };
    let mut room = room.lock().await;
    if !room.seat_claimed_by(req.player_index, req.client) {
        return (StatusCode::FORBIDDEN, "seat not claimed by caller".to_string())
            .into_response();
    }

    match room.state.draw_card(req.player_index) {
        Ok(next) => {
            info!(%room_id, player = req.player_index, "card drawn");
            room.state = next;
            room.touch();
            let saved = state.rooms.persist(&room_id, &room);
            room.broadcast_state();
            Json(MoveResponse::ok(
                ClientView::redact(&room.state, Some(req.player_index)),
                saved,
            ))
            .into_response()
        }
        Err(e) => {
            info!(%room_id, player = req.player_index, error = %e, "draw rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

pub async fn call_uno(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<SeatRequest>,
) -> impl IntoResponse {
    let Some(room) = lookup(&state, &room_id).await else {
        return (StatusCode::NOT_FOUND, "room not found".to_string()).into_response();
    };
    let mut room = room.lock().await;
    if !room.seat_claimed_by(req.player_index, req.client) {
        return (StatusCode::FORBIDDEN, "seat not claimed by caller".to_string())
            .into_response();
    }

    match room.state.call_uno(req.player_index) {
        Ok(next) => {
            info!(%room_id, player = req.player_index, "UNO called");
            room.state = next;
            room.touch();
            let saved = state.rooms.persist(&room_id, &room);
            room.broadcast_state();
            Json(MoveResponse::ok(
                ClientView::redact(&room.state, Some(req.player_index)),
                saved,
            ))
            .into_response()
        }
        Err(e) => {
            info!(%room_id, player = req.player_index, error = %e, "UNO call rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

/// Rematch with the same roster; scores carry over. Subscribers get a
/// reset event followed by the fresh snapshot.
pub async fn reset_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    let Some(room) = lookup(&state, &room_id).await else {
        return (StatusCode::NOT_FOUND, "room not found".to_string()).into_response();
    };
    let mut room = room.lock().await;

    match room.state.reset_for_rematch() {
        Ok(next) => {
            info!(%room_id, "game reset");
            room.state = next;
            room.touch();
            let saved = state.rooms.persist(&room_id, &room);
            room.broadcast_reset();
            room.broadcast_state();
            Json(MoveResponse::ok(ClientView::redact(&room.state, None), saved)).into_response()
        }
        Err(e) => {
            info!(%room_id, error = %e, "reset rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

/// Push channel: every accepted transition in the room is fanned out to
/// all connected sockets, the originator included, redacted per
/// subscriber. A socket that presented the `client` id from its join
/// response owns its seat for the lifetime of the connection.
pub async fn room_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<WsQuery>,
) -> Response {
    let Some(room) = lookup(&state, &room_id).await else {
        return (StatusCode::NOT_FOUND, "room not found".to_string()).into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, room, query))
}

async fn handle_socket(
    socket: WebSocket,
    room_id: String,
    room: Arc<Mutex<Room>>,
    query: WsQuery,
) {
    let (mut sender, mut receiver) = socket.split();

    let (mut events, viewer, snapshot) = {
        let room = room.lock().await;
        let viewer = resolve_viewer(&room, query.player, query.client);
        (
            room.subscribe(),
            viewer,
            ClientView::redact(&room.state, viewer),
        )
    };
    info!(%room_id, ?viewer, "subscriber connected");

    // Initial snapshot so a late joiner does not wait for the next
    // transition.
    let initial = WsEvent {
        event: "game-state-updated",
        state: Some(snapshot),
    };
    if let Ok(json) = serde_json::to_string(&initial) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let payload = match event {
                    Ok(RoomEvent::StateUpdated(state)) => WsEvent {
                        event: "game-state-updated",
                        state: Some(ClientView::redact(&state, viewer)),
                    },
                    Ok(RoomEvent::Reset) => WsEvent {
                        event: "game-reset",
                        state: None,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        // Dropped intermediate snapshots are harmless;
                        // resync from the current one.
                        info!(%room_id, skipped, "subscriber lagged, resyncing");
                        let room = room.lock().await;
                        WsEvent {
                            event: "game-state-updated",
                            state: Some(ClientView::redact(&room.state, viewer)),
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                let json = match serde_json::to_string(&payload) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(%room_id, error = %e, "failed to serialize event");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // This channel is push-only; client frames are
                    // ignored apart from keepalives.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let Some(client) = query.client {
        room.lock().await.release_seat(client);
    }
    info!(%room_id, ?viewer, "subscriber disconnected");
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms/{room}/join", post(join_room))
        .route("/rooms/{room}/state", get(get_state))
        .route("/rooms/{room}/start", post(start_game))
        .route("/rooms/{room}/play", post(play_card))
        .route("/rooms/{room}/draw", post(draw_card))
        .route("/rooms/{room}/uno", post(call_uno))
        .route("/rooms/{room}/reset", post(reset_game))
        .route("/rooms/{room}/ws", get(room_events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, data_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let store = RoomStore::new(data_dir)?;
    let state = AppState {
        rooms: RoomManager::new(store),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "uno room server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::json;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn test_app() -> (Router, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let store = RoomStore::new(temp_dir.path().to_path_buf()).unwrap();
        let state = AppState {
            rooms: RoomManager::new(store),
        };
        (router(state), temp_dir)
    }

    async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn post_empty(app: &Router, uri: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn get_uri(app: &Router, uri: &str) -> Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_of<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn join(app: &Router, room: &str, name: &str) -> JoinResponse {
        let response = post_json(
            app,
            &format!("/rooms/{room}/join"),
            json!({ "name": name }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_of(response).await
    }

    #[tokio::test]
    async fn join_assigns_seats_in_order() {
        let (app, _dir) = test_app();

        let alice = join(&app, "table-1", "Alice").await;
        let bob = join(&app, "table-1", "Bob").await;

        assert_eq!(alice.player_index, 0);
        assert_eq!(bob.player_index, 1);
        assert_eq!(bob.state.players.len(), 2);
        assert_eq!(bob.state.players[0].name, "Alice");
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_while_connected() {
        let (app, _dir) = test_app();
        join(&app, "table-1", "Alice").await;

        let response = post_json(&app, "/rooms/table-1/join", json!({ "name": "Alice" })).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn fifth_player_is_rejected() {
        let (app, _dir) = test_app();
        for name in ["a", "b", "c", "d"] {
            join(&app, "table-1", name).await;
        }

        let response = post_json(&app, "/rooms/table-1/join", json!({ "name": "e" })).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn bad_room_ids_and_names_are_rejected() {
        let (app, _dir) = test_app();

        let response = post_json(&app, "/rooms/..%2Fetc/join", json!({ "name": "Alice" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post_json(&app, "/rooms/table-1/join", json!({ "name": "  " })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_room_state_reports_not_existing() {
        let (app, _dir) = test_app();

        let response = get_uri(&app, "/rooms/ghost/state").await;
        assert_eq!(response.status(), StatusCode::OK);
        let state: StateResponse = body_of(response).await;
        assert!(!state.exists);
        assert!(state.game_state.is_none());
    }

    #[tokio::test]
    async fn start_requires_two_players() {
        let (app, _dir) = test_app();
        join(&app, "table-1", "Alice").await;

        let response = post_empty(&app, "/rooms/table-1/start").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn started_game_redacts_per_viewer() {
        let (app, _dir) = test_app();
        let alice = join(&app, "table-1", "Alice").await;
        join(&app, "table-1", "Bob").await;

        let response = post_empty(&app, "/rooms/table-1/start").await;
        assert_eq!(response.status(), StatusCode::OK);

        // Alice sees her own cards, Bob's as placeholders.
        let uri = format!("/rooms/table-1/state?player=0&client={}", alice.client_id);
        let response = get_uri(&app, &uri).await;
        let state: StateResponse = body_of(response).await;
        let view = state.game_state.unwrap();
        assert!(view.game_started);
        assert!(view.players[0].hand.iter().all(Option::is_some));
        assert!(view.players[1].hand.iter().all(Option::is_none));
        assert_eq!(view.players[1].hand.len(), 7);

        // Without a claimed seat everything is hidden.
        let response = get_uri(&app, "/rooms/table-1/state").await;
        let state: StateResponse = body_of(response).await;
        let view = state.game_state.unwrap();
        assert!(view.players[0].hand.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn state_poll_reveals_a_hand_only_to_its_claimant() {
        let (app, _dir) = test_app();
        let alice = join(&app, "table-1", "Alice").await;
        let bob = join(&app, "table-1", "Bob").await;
        post_empty(&app, "/rooms/table-1/start").await;

        // Naming a seat without its credential shows nothing.
        let response = get_uri(&app, "/rooms/table-1/state?player=1").await;
        let state: StateResponse = body_of(response).await;
        let view = state.game_state.unwrap();
        assert!(view.players[1].hand.iter().all(Option::is_none));

        // Someone else's credential does not unlock the seat either.
        let uri = format!("/rooms/table-1/state?player=1&client={}", alice.client_id);
        let response = get_uri(&app, &uri).await;
        let state: StateResponse = body_of(response).await;
        let view = state.game_state.unwrap();
        assert!(view.players[1].hand.iter().all(Option::is_none));

        // The claimant sees its own hand and nobody else's.
        let uri = format!("/rooms/table-1/state?player=1&client={}", bob.client_id);
        let response = get_uri(&app, &uri).await;
        let state: StateResponse = body_of(response).await;
        let view = state.game_state.unwrap();
        assert!(view.players[1].hand.iter().all(Option::is_some));
        assert!(view.players[0].hand.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn out_of_turn_play_is_rejected() {
        let (app, _dir) = test_app();
        join(&app, "table-1", "Alice").await;
        let bob = join(&app, "table-1", "Bob").await;
        post_empty(&app, "/rooms/table-1/start").await;

        let response = post_json(
            &app,
            "/rooms/table-1/play",
            json!({ "player_index": 1, "card_index": 0, "client": bob.client_id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn moves_require_the_seat_credential() {
        let (app, _dir) = test_app();
        join(&app, "table-1", "Alice").await;
        let bob = join(&app, "table-1", "Bob").await;
        post_empty(&app, "/rooms/table-1/start").await;

        // A made-up credential cannot move for seat 0.
        let response = post_json(
            &app,
            "/rooms/table-1/play",
            json!({ "player_index": 0, "card_index": 0, "client": Uuid::new_v4() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Neither can another player's.
        let response = post_json(
            &app,
            "/rooms/table-1/draw",
            json!({ "player_index": 0, "client": bob.client_id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = post_json(
            &app,
            "/rooms/table-1/uno",
            json!({ "player_index": 0, "client": bob.client_id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_color_is_rejected() {
        let (app, _dir) = test_app();
        let alice = join(&app, "table-1", "Alice").await;
        join(&app, "table-1", "Bob").await;
        post_empty(&app, "/rooms/table-1/start").await;

        let response = post_json(
            &app,
            "/rooms/table-1/play",
            json!({
                "player_index": 0,
                "card_index": 0,
                "client": alice.client_id,
                "color": "purple"
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn uno_call_with_full_hand_is_rejected() {
        let (app, _dir) = test_app();
        let alice = join(&app, "table-1", "Alice").await;
        join(&app, "table-1", "Bob").await;
        post_empty(&app, "/rooms/table-1/start").await;

        let response = post_json(
            &app,
            "/rooms/table-1/uno",
            json!({ "player_index": 0, "client": alice.client_id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn moves_advance_the_shared_game() {
        let (app, _dir) = test_app();
        let alice = join(&app, "table-1", "Alice").await;
        let bob = join(&app, "table-1", "Bob").await;
        let clients = [alice.client_id, bob.client_id];
        post_empty(&app, "/rooms/table-1/start").await;

        // Drive a few turns through the API alone: play the first legal
        // card (retrying wilds with a color) or draw.
        for _ in 0..6 {
            let response = get_uri(&app, "/rooms/table-1/state").await;
            let state: StateResponse = body_of(response).await;
            let view = state.game_state.unwrap();
            if view.winner.is_some() {
                break;
            }
            let seat = view.current_player;
            let hand_size = view.players[seat].hand.len();

            let mut moved = false;
            for card_index in 0..hand_size {
                let response = post_json(
                    &app,
                    "/rooms/table-1/play",
                    json!({
                        "player_index": seat,
                        "card_index": card_index,
                        "client": clients[seat]
                    }),
                )
                .await;
                if response.status() != StatusCode::OK {
                    continue;
                }
                let outcome: MoveResponse = body_of(response).await;
                if outcome.status == "needs_color" {
                    let response = post_json(
                        &app,
                        "/rooms/table-1/play",
                        json!({
                            "player_index": seat,
                            "card_index": card_index,
                            "client": clients[seat],
                            "color": "red"
                        }),
                    )
                    .await;
                    if response.status() != StatusCode::OK {
                        continue;
                    }
                }
                moved = true;
                break;
            }

            if !moved {
                let response = post_json(
                    &app,
                    "/rooms/table-1/draw",
                    json!({ "player_index": seat, "client": clients[seat] }),
                )
                .await;
                assert_eq!(response.status(), StatusCode::OK);
            }
        }

        // The shared game is still consistent after the exchanges.
        let response = get_uri(&app, "/rooms/table-1/state").await;
        let state: StateResponse = body_of(response).await;
        let view = state.game_state.unwrap();
        let in_hands: usize = view.players.iter().map(|p| p.hand.len()).sum();
        assert!(view.deck_remaining + in_hands > 0);
        assert!(view.current_player < view.players.len());
    }

    #[tokio::test]
    async fn reset_starts_a_rematch() {
        let (app, _dir) = test_app();
        join(&app, "table-1", "Alice").await;
        join(&app, "table-1", "Bob").await;
        post_empty(&app, "/rooms/table-1/start").await;

        let response = post_empty(&app, "/rooms/table-1/reset").await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome: MoveResponse = body_of(response).await;
        let view = outcome.state.unwrap();
        assert!(view.game_started);
        assert_eq!(view.winner, None);
        assert_eq!(view.players.len(), 2);
        for player in &view.players {
            assert_eq!(player.hand.len(), 7);
        }
    }

    #[tokio::test]
    async fn actions_on_unknown_rooms_are_not_found() {
        let (app, _dir) = test_app();

        let response = post_empty(&app, "/rooms/ghost/start").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = post_json(
            &app,
            "/rooms/ghost/play",
            json!({ "player_index": 0, "card_index": 0, "client": Uuid::new_v4() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_route_rejects_a_plain_http_request() {
        let (app, _dir) = test_app();
        join(&app, "table-1", "Alice").await;

        // Without the upgrade handshake headers the route refuses the
        // connection instead of serving anything.
        let response = get_uri(&app, "/rooms/table-1/ws").await;
        assert!(response.status().is_client_error());
    }

    #[test]
    fn subscriber_viewer_requires_the_seat_credential() {
        let mut room = Room::new(crate::uno::GameState::new(Vec::new()));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        room.claim_seat("Alice", alice).unwrap();
        room.claim_seat("Bob", bob).unwrap();

        assert_eq!(resolve_viewer(&room, Some(0), Some(alice)), Some(0));
        assert_eq!(resolve_viewer(&room, Some(0), Some(bob)), None);
        assert_eq!(resolve_viewer(&room, Some(0), None), None);
        assert_eq!(resolve_viewer(&room, None, Some(alice)), None);
        assert_eq!(resolve_viewer(&room, Some(5), Some(alice)), None);
    }
}

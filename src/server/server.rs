use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::catalog::{CatalogService, Track};
use crate::library::LibraryStore;
use crate::mailer::Mailer;
use crate::player::{PlayerEvent, PlayerManager, PlayerSnapshot, SurfaceCommand};
use crate::user::{
    AuthTokenValue, LoginError, PasswordResetError, RegistrationError, UserManager,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::state::*;
use super::stream::{stream_audio, AudioResolver};
use super::{log_requests, ServerConfig, Session};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[derive(Deserialize, Debug)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Deserialize)]
struct RegisterBody {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct ForgotPasswordBody {
    email: Option<String>,
}

#[derive(Deserialize)]
struct ResetPasswordBody {
    token: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Deserialize)]
struct QueueBody {
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
struct SeekBody {
    fraction: f64,
}

#[derive(Deserialize)]
struct RateBody {
    rate: f64,
}

#[derive(Serialize)]
struct PlayerStateResponse {
    player: PlayerSnapshot,
    commands: Vec<SurfaceCommand>,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn search(
    _session: Session,
    State(catalog): State<GuardedCatalog>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return error_json(StatusCode::BAD_REQUEST, "Search query is required."),
    };

    match catalog.search(&query).await {
        Ok(tracks) => Json(tracks).into_response(),
        Err(err) => {
            error!("search failed: {}", err);
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to search the video catalog.",
            )
        }
    }
}

async fn popular(_session: Session, State(catalog): State<GuardedCatalog>) -> Response {
    match catalog.popular().await {
        Ok(tracks) => Json(tracks).into_response(),
        Err(err) => {
            error!("popular fetch failed: {}", err);
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch popular videos.",
            )
        }
    }
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<RegisterBody>,
) -> Response {
    let (username, email, password) = match (body.username, body.email, body.password) {
        (Some(u), Some(e), Some(p)) => (u, e, p),
        _ => {
            return error_json(
                StatusCode::BAD_REQUEST,
                "username, email and password are required",
            )
        }
    };

    match user_manager.register(&username, &email, &password) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "message": "User created." })),
        )
            .into_response(),
        Err(RegistrationError::DuplicateUsername) => {
            error_json(StatusCode::CONFLICT, "Username already taken.")
        }
        Err(RegistrationError::DuplicateEmail) => {
            error_json(StatusCode::CONFLICT, "Email already registered.")
        }
        Err(RegistrationError::InvalidInput(msg)) => error_json(StatusCode::BAD_REQUEST, &msg),
        Err(RegistrationError::Internal(err)) => {
            error!("registration failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed.")
        }
    }
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    let (identifier, password) = match (body.username, body.password) {
        (Some(u), Some(p)) => (u, p),
        _ => return error_json(StatusCode::BAD_REQUEST, "username and password are required"),
    };

    match user_manager.login(&identifier, &password) {
        Ok((user, auth_token)) => {
            debug!("user {} logged in", user.username);
            let response_body = LoginSuccessResponse {
                access_token: auth_token.value.0.clone(),
            };
            let response_body = serde_json::to_string(&response_body).unwrap();

            let cookie_value = HeaderValue::from_str(&format!(
                "session_token={}; Path=/; HttpOnly",
                auth_token.value.0
            ))
            .unwrap();
            response::Builder::new()
                .status(StatusCode::OK)
                .header(header::SET_COOKIE, cookie_value)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(response_body))
                .unwrap()
        }
        Err(LoginError::UnknownUser) | Err(LoginError::WrongPassword) => {
            error_json(StatusCode::UNAUTHORIZED, "Invalid credentials.")
        }
        Err(LoginError::Internal(err)) => {
            error!("login failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Login failed.")
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    match user_manager.logout(session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new("session_token", ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => error_json(StatusCode::BAD_REQUEST, "Logout failed."),
    }
}

async fn forgot_password(
    State(user_manager): State<GuardedUserManager>,
    State(mailer): State<GuardedMailer>,
    Json(body): Json<ForgotPasswordBody>,
) -> Response {
    let email = match body.email {
        Some(email) if !email.trim().is_empty() => email,
        _ => return error_json(StatusCode::BAD_REQUEST, "email is required"),
    };

    match user_manager.start_password_reset(&email) {
        Ok(token) => {
            mailer.send_password_reset(&email, &token.value);
            Json(serde_json::json!({ "message": "Password reset email dispatched." }))
                .into_response()
        }
        Err(PasswordResetError::UnknownEmail) => {
            error_json(StatusCode::NOT_FOUND, "Email not found.")
        }
        Err(err) => {
            error!("password reset request failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Password reset failed.")
        }
    }
}

async fn reset_password(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<ResetPasswordBody>,
) -> Response {
    let (token, password) = match (body.token, body.password) {
        (Some(t), Some(p)) => (t, p),
        _ => return error_json(StatusCode::BAD_REQUEST, "token and password are required"),
    };

    match user_manager.confirm_password_reset(&token, &password) {
        Ok(()) => Json(serde_json::json!({ "message": "Password updated." })).into_response(),
        Err(PasswordResetError::InvalidToken) => {
            error_json(StatusCode::UNAUTHORIZED, "Invalid or expired reset token.")
        }
        Err(PasswordResetError::InvalidInput(msg)) => error_json(StatusCode::BAD_REQUEST, &msg),
        Err(err) => {
            error!("password reset failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Password reset failed.")
        }
    }
}

fn player_response(player_manager: &PlayerManager, user_id: usize) -> Response {
    let (player, commands) =
        player_manager.with_session(user_id, |s| (s.snapshot(), s.take_commands()));
    Json(PlayerStateResponse { player, commands }).into_response()
}

async fn set_player_queue(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
    Json(body): Json<QueueBody>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.set_track_list(body.tracks));
    player_response(&player_manager, session.user_id)
}

async fn player_play_index(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
    Path(index): Path<usize>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.play_by_index(index));
    player_response(&player_manager, session.user_id)
}

async fn player_next(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.play_next());
    player_response(&player_manager, session.user_id)
}

async fn player_prev(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.play_prev());
    player_response(&player_manager, session.user_id)
}

async fn player_seek(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
    Json(body): Json<SeekBody>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.seek(body.fraction));
    player_response(&player_manager, session.user_id)
}

async fn player_rate(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
    Json(body): Json<RateBody>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.set_playback_rate(body.rate));
    player_response(&player_manager, session.user_id)
}

async fn player_surface_ready(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.surface_ready());
    player_response(&player_manager, session.user_id)
}

async fn player_event(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
    Json(event): Json<PlayerEvent>,
) -> Response {
    player_manager.with_session(session.user_id, |s| s.handle_event(event));
    player_response(&player_manager, session.user_id)
}

async fn player_state(
    session: Session,
    State(player_manager): State<GuardedPlayerManager>,
) -> Response {
    player_response(&player_manager, session.user_id)
}

async fn get_library(State(library): State<GuardedLibrary>) -> Response {
    match library.all() {
        Ok(tracks) => Json(tracks).into_response(),
        Err(err) => {
            error!("library read failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Library unavailable.")
        }
    }
}

async fn add_library_track(
    State(library): State<GuardedLibrary>,
    Json(track): Json<Track>,
) -> Response {
    match library.add(track) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            error!("library add failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Library unavailable.")
        }
    }
}

async fn remove_library_track(
    State(library): State<GuardedLibrary>,
    Path(video_id): Path<String>,
) -> Response {
    match library.remove(&video_id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            error!("library remove failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Library unavailable.")
        }
    }
}

async fn library_contains(
    State(library): State<GuardedLibrary>,
    Path(video_id): Path<String>,
) -> Response {
    match library.contains(&video_id) {
        Ok(saved) => Json(serde_json::json!({ "saved": saved })).into_response(),
        Err(err) => {
            error!("library lookup failed: {}", err);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Library unavailable.")
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn make_app(
    config: ServerConfig,
    catalog: Arc<CatalogService>,
    user_manager: Arc<UserManager>,
    player_manager: Arc<PlayerManager>,
    library: Arc<dyn LibraryStore>,
    mailer: Arc<dyn Mailer>,
    resolver: Option<Arc<AudioResolver>>,
) -> Router {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        catalog,
        user_manager,
        player_manager,
        library,
        mailer,
        resolver,
    };

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .with_state(state.clone());

    let catalog_routes: Router = Router::new()
        .route("/search", get(search))
        .route("/popular", get(popular))
        .route("/play/{video_id}", get(stream_audio))
        .with_state(state.clone());

    let player_routes: Router = Router::new()
        .route("/player/queue", post(set_player_queue))
        .route("/player/play/{index}", post(player_play_index))
        .route("/player/next", post(player_next))
        .route("/player/prev", post(player_prev))
        .route("/player/seek", post(player_seek))
        .route("/player/rate", post(player_rate))
        .route("/player/ready", post(player_surface_ready))
        .route("/player/event", post(player_event))
        .route("/player/state", get(player_state))
        .with_state(state.clone());

    let library_routes: Router = Router::new()
        .route("/library", get(get_library))
        .route("/library", put(add_library_track))
        .route("/library/{video_id}", get(library_contains))
        .route("/library/{video_id}", delete(remove_library_track))
        .with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .merge(auth_routes)
        .merge(catalog_routes)
        .merge(player_routes)
        .merge(library_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

#[allow(clippy::too_many_arguments)]
pub async fn run_server(
    config: ServerConfig,
    catalog: Arc<CatalogService>,
    user_manager: Arc<UserManager>,
    player_manager: Arc<PlayerManager>,
    library: Arc<dyn LibraryStore>,
    mailer: Arc<dyn Mailer>,
    resolver: Option<Arc<AudioResolver>>,
) -> anyhow::Result<()> {
    let port = config.port;
    let app = make_app(
        config,
        catalog,
        user_manager.clone(),
        player_manager.clone(),
        library,
        mailer,
        resolver,
    );

    // One shared ticker drives progress for every session.
    player_manager.spawn_progress_ticker();

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    Ok(axum::serve(listener, app).await?)
}

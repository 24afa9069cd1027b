//!
//! quill HTTP server
//! -----------------
//! This module defines the axum-based, server-rendered HTTP surface for quill.
//!
//! Responsibilities:
//! - Session management with an opaque-token cookie resolved server-side.
//! - Signup/login/signout endpoints backed by the `security` and `identity`
//!   modules.
//! - The authorization gate: every protected handler resolves the session
//!   cookie to a `Principal` first and redirects anonymous callers to the
//!   login page; delete additionally requires ownership of the target post.
//! - Post identity for view/delete travels in the request (path or form
//!   parameter), never in shared process state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{AuthProvider, LocalAuthProvider, LoginRequest, Principal, SessionManager};
use crate::posts;
use crate::security;
use crate::storage::SharedStore;

pub mod render;

const SESSION_COOKIE: &str = "quill_session";

/// Shared server state injected into all handlers.
///
/// Holds the store handle, the session table and the authenticator. The
/// authenticator shares the same `SessionManager`, so tokens it mints are the
/// ones the gate resolves.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub sessions: SessionManager,
    pub auth: Arc<LocalAuthProvider>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        let sessions = SessionManager::new();
        let auth = Arc::new(LocalAuthProvider::new(sessions.clone()));
        AppState { store, sessions, auth }
    }
}

fn log_startup_config(http_port: u16, db_root: &str) {
    let cwd = std::env::current_dir().ok();
    let db_env = std::env::var("QUILL_DB_FOLDER").ok();
    info!(
        target: "startup",
        "quill starting. http_port={}, db_root_param={:?}, QUILL_DB_FOLDER_env={:?}, cwd={:?}",
        http_port, db_root, db_env, cwd
    );
}

/// Start the quill HTTP server bound to the given port, persisting under
/// `db_root`. Mounts every route and serves until the process exits.
pub async fn run_with_ports(http_port: u16, db_root: &str) -> anyhow::Result<()> {
    log_startup_config(http_port, db_root);

    let store = SharedStore::new(db_root)?;
    let app_state = AppState::new(store);
    let app = router(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Backward-compatible entry that uses defaults
/// Convenience entry point using the default port (3000) and db root "dbs".
pub async fn run() -> anyhow::Result<()> {
    run_with_ports(3000, "dbs").await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "quill ok" }))
        .route("/", get(home))
        .route("/about", get(about))
        .route("/contact", get(contact))
        .route("/compose", get(compose_form).post(compose_submit))
        .route("/my-posts", get(my_posts))
        .route("/posts/{id}", get(view_post))
        .route("/delete", post(delete_submit))
        .route("/signup", get(signup_form).post(signup_submit))
        .route("/login", get(login_form).post(login_submit))
        .route("/signout", get(signout))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    username: String,
    name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ComposePayload {
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct DeletePayload {
    id: String,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/",
        SESSION_COOKIE, token
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

/// The authorization gate's first half: cookie -> token -> user.
///
/// Returns `None` for missing/stale cookies and for sessions whose user no
/// longer exists; callers treat that as anonymous and redirect, never error.
fn current_principal(state: &AppState, headers: &HeaderMap) -> Option<Principal> {
    let token = parse_cookie(headers, SESSION_COOKIE)?;
    let user_id = state.sessions.resolve(&token)?;
    let user = security::find_user_by_id(&state.store, &user_id).ok()?;
    Some(Principal {
        user_id: user.id,
        username: user.username,
        name: user.name,
    })
}

async fn home(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let Some(who) = current_principal(&state, &headers) else {
        return Ok(Redirect::to("/login").into_response());
    };
    let feed = posts::list_all(&state.store)?;
    Ok(Html(render::home_page(&feed, &who)).into_response())
}

async fn about(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let signed_in = current_principal(&state, &headers).is_some();
    Html(render::about_page(signed_in))
}

async fn contact(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let signed_in = current_principal(&state, &headers).is_some();
    Html(render::contact_page(signed_in))
}

async fn compose_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_principal(&state, &headers).is_none() {
        return Redirect::to("/login").into_response();
    }
    Html(render::compose_page()).into_response()
}

async fn compose_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<ComposePayload>,
) -> AppResult<Response> {
    let Some(who) = current_principal(&state, &headers) else {
        return Ok(Redirect::to("/login").into_response());
    };
    match posts::create_post(&state.store, &who, &payload.title, &payload.content, Utc::now()) {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        // An empty title goes back to the form rather than erroring
        Err(AppError::UserInput { .. }) => Ok(Redirect::to("/compose").into_response()),
        Err(e) => {
            error!("compose failed: {}", e);
            Err(e)
        }
    }
}

async fn my_posts(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let Some(who) = current_principal(&state, &headers) else {
        return Ok(Redirect::to("/login").into_response());
    };
    let mine = posts::list_by_owner(&state.store, &who.user_id)?;
    Ok(Html(render::my_posts_page(&mine, &who)).into_response())
}

async fn view_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(who) = current_principal(&state, &headers) else {
        return Ok(Redirect::to("/login").into_response());
    };
    match posts::find_by_id(&state.store, &id) {
        Ok(post) => {
            // Non-owners still view the post; only the affordance differs
            let can_delete = post.owner_id == who.user_id;
            Ok(Html(render::post_page(&post, can_delete)).into_response())
        }
        Err(AppError::NotFound { .. }) => Ok(Redirect::to("/").into_response()),
        Err(e) => {
            error!("post lookup failed: {}", e);
            Err(e)
        }
    }
}

async fn delete_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<DeletePayload>,
) -> AppResult<Response> {
    let Some(who) = current_principal(&state, &headers) else {
        return Ok(Redirect::to("/login").into_response());
    };
    match posts::delete_post(&state.store, &payload.id, &who.user_id) {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(AppError::Forbidden { .. }) => {
            // Hard denial, surfaced as a silent redirect without deleting
            warn!("delete denied: user {} does not own post {}", who.user_id, payload.id);
            Ok(Redirect::to("/").into_response())
        }
        Err(AppError::NotFound { .. }) => Ok(Redirect::to("/").into_response()),
        Err(e) => {
            error!("delete failed: {}", e);
            Err(e)
        }
    }
}

async fn signup_form() -> Html<String> {
    Html(render::signup_page())
}

async fn signup_submit(
    State(state): State<AppState>,
    Form(payload): Form<SignupPayload>,
) -> AppResult<Response> {
    match security::register_user(&state.store, &payload.username, &payload.name, &payload.password) {
        Ok(_) => {
            // Log the new account straight in, as the signup form promises
            let req = LoginRequest {
                username: payload.username.clone(),
                password: payload.password.clone(),
            };
            match state.auth.login(&state.store, &req) {
                Ok(resp) => {
                    let mut h = HeaderMap::new();
                    h.insert("Set-Cookie", set_session_cookie(&resp.token));
                    Ok((h, Redirect::to("/")).into_response())
                }
                Err(e) => {
                    error!("post-signup login failed: {}", e);
                    Ok(Redirect::to("/login").into_response())
                }
            }
        }
        // No detail about which field collided leaks to the client
        Err(AppError::Conflict { .. }) | Err(AppError::UserInput { .. }) => {
            Ok(Redirect::to("/signup").into_response())
        }
        Err(e) => {
            error!("signup failed: {}", e);
            Err(e)
        }
    }
}

async fn login_form() -> Html<String> {
    Html(render::login_page())
}

async fn login_submit(
    State(state): State<AppState>,
    Form(payload): Form<LoginPayload>,
) -> AppResult<Response> {
    let req = LoginRequest {
        username: payload.username,
        password: payload.password,
    };
    match state.auth.login(&state.store, &req) {
        Ok(resp) => {
            let mut h = HeaderMap::new();
            h.insert("Set-Cookie", set_session_cookie(&resp.token));
            Ok((h, Redirect::to("/")).into_response())
        }
        Err(AppError::Auth { .. }) => Ok(Redirect::to("/login").into_response()),
        Err(e) => {
            error!("login failed: {}", e);
            Err(e)
        }
    }
}

async fn signout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.auth.logout(&token);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (h, Redirect::to("/")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_state() -> (tempfile::TempDir, AppState) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SharedStore::new(tmp.path()).unwrap();
        (tmp, AppState::new(store))
    }

    fn headers_with_cookie(token: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            "cookie",
            HeaderValue::from_str(&format!("other=1; {}={}", SESSION_COOKIE, token)).unwrap(),
        );
        h
    }

    #[test]
    fn parse_cookie_picks_the_named_pair() {
        let h = headers_with_cookie("tok-123");
        assert_eq!(parse_cookie(&h, SESSION_COOKIE), Some("tok-123".to_string()));
        assert_eq!(parse_cookie(&h, "missing"), None);
        assert_eq!(parse_cookie(&HeaderMap::new(), SESSION_COOKIE), None);
    }

    #[test]
    fn gate_resolves_cookie_to_principal() {
        let (_tmp, state) = mk_state();
        let user = security::register_user(&state.store, "alice", "Alice", "p@ss").unwrap();
        let token = state.sessions.create(&user.id);
        let who = current_principal(&state, &headers_with_cookie(&token)).unwrap();
        assert_eq!(who.user_id, user.id);
        assert_eq!(who.name, "Alice");
    }

    #[test]
    fn gate_treats_unknown_token_as_anonymous() {
        let (_tmp, state) = mk_state();
        assert!(current_principal(&state, &headers_with_cookie("bogus")).is_none());
        assert!(current_principal(&state, &HeaderMap::new()).is_none());
    }

    #[test]
    fn gate_rejects_session_for_vanished_user() {
        let (_tmp, state) = mk_state();
        let token = state.sessions.create("4be1c1a2-0c63-4f3b-9a57-1c2d3e4f5a6b");
        assert!(current_principal(&state, &headers_with_cookie(&token)).is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let v = set_session_cookie("tok");
        let s = v.to_str().unwrap();
        assert!(s.starts_with("quill_session=tok"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Strict"));
        let c = clear_session_cookie();
        assert!(c.to_str().unwrap().contains("Expires=Thu, 01 Jan 1970"));
    }
}

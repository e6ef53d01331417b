//! 状态面板
//!
//! 面板进程只读机器人写出的状态文件、日志文件，读写设置文件，
//! 与机器人进程没有其他耦合。

mod page;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::core::settings_store::SettingsStore;
use crate::core::status::{StatusBoard, StatusSnapshot};
use crate::domain::{ReplyDict, Settings};
use crate::infrastructure::auth::{passphrase_matches, JwtService};
use crate::infrastructure::logger::tail_lines;
use crate::infrastructure::qr;

/// 面板展示的粉丝数量上限
pub const DASHBOARD_FANS_LIMIT: usize = 100;
/// 面板展示的日志行数
pub const DASHBOARD_LOG_LINES: usize = 50;
const QRCODE_SIZE: u32 = 240;

// ==================== 错误响应 ====================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ==================== 状态 ====================

#[derive(Clone)]
pub struct AppState {
    pub board: StatusBoard,
    pub settings: SettingsStore,
    pub log_path: PathBuf,
    pub jwt_service: JwtService,
}

// ==================== 请求类型 ====================

#[derive(Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct LoginRememberRequest {
    pub login_remember: bool,
}

// ==================== 访问控制 ====================

/// 口令为空时放行，否则校验 `Authorization: Bearer` 会话令牌
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Settings, Response> {
    let settings = state.settings.load().await;
    if !settings.requires_token() {
        return Ok(settings);
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if state.jwt_service.validate_token(token, &settings.token_key).is_ok() => {
            Ok(settings)
        }
        _ => Err(error_response(StatusCode::UNAUTHORIZED, "Unauthorized")),
    }
}

// ==================== 处理器 ====================

async fn index() -> Html<&'static str> {
    Html(page::INDEX_HTML)
}

/// 健康检查
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn unlock(State(state): State<Arc<AppState>>, Json(req): Json<UnlockRequest>) -> Response {
    let settings = state.settings.load().await;
    if !settings.requires_token() {
        return Json(serde_json::json!({
            "success": true,
            "data": { "required": false, "token": null }
        }))
        .into_response();
    }

    if !passphrase_matches(req.token.trim(), &settings.token_key) {
        warn!("面板口令错误");
        return error_response(StatusCode::UNAUTHORIZED, "口令错误");
    }

    match state.jwt_service.generate_token(&settings.token_key) {
        Ok(token) => {
            info!("面板已解锁");
            Json(serde_json::json!({
                "success": true,
                "data": { "required": true, "token": token }
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to generate token: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token")
        }
    }
}

async fn read_snapshot(state: &AppState) -> Result<Option<StatusSnapshot>, Response> {
    state.board.read().await.map_err(|e| {
        error!("Failed to read status file: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read status")
    })
}

/// 运行状态；快照缺失或超过 5 秒未更新视为服务异常
async fn get_status(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }
    let snapshot = match read_snapshot(&state).await {
        Ok(snapshot) => snapshot,
        Err(resp) => return resp,
    };

    let now = Utc::now().timestamp_millis();
    let service_ok = snapshot.as_ref().is_some_and(|s| s.is_fresh(now));
    let mut data = serde_json::to_value(snapshot.unwrap_or_default()).unwrap_or_default();
    if let Some(map) = data.as_object_mut() {
        map.remove("fans_list");
        map.insert("service_ok".to_string(), service_ok.into());
    }

    Json(serde_json::json!({ "success": true, "data": data })).into_response()
}

async fn get_fans(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }
    let snapshot = match read_snapshot(&state).await {
        Ok(snapshot) => snapshot.unwrap_or_default(),
        Err(resp) => return resp,
    };

    let fans: Vec<serde_json::Value> = snapshot
        .fans_list
        .iter()
        .take(DASHBOARD_FANS_LIMIT)
        .map(|fan| {
            serde_json::json!({
                "uname": fan.uname,
                "mid": fan.mid,
                "space_url": fan.space_url(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "success": true,
        "data": {
            "total_fans": snapshot.stats.total_fans,
            "loaded": snapshot.fans_list.len(),
            "fans": fans,
        }
    }))
    .into_response()
}

async fn get_login_qrcode(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }
    let snapshot = match read_snapshot(&state).await {
        Ok(snapshot) => snapshot.unwrap_or_default(),
        Err(resp) => return resp,
    };
    if snapshot.login_url.is_empty() || snapshot.login_status.is_logged_in() {
        return error_response(StatusCode::NOT_FOUND, "暂无登录二维码");
    }

    match qr::render_svg(&snapshot.login_url, QRCODE_SIZE) {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            error!("Failed to render qrcode: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render qrcode")
        }
    }
}

async fn get_logs(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }
    match tail_lines(&state.log_path, DASHBOARD_LOG_LINES).await {
        Ok(lines) => Json(serde_json::json!({ "success": true, "data": lines })).into_response(),
        Err(e) => {
            error!("Failed to read log file: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read logs")
        }
    }
}

async fn get_settings(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers).await {
        Ok(settings) => Json(serde_json::json!({ "success": true, "data": settings })).into_response(),
        Err(resp) => resp,
    }
}

/// 去掉首尾空白，丢弃空关键词
fn tidy_dict(dict: ReplyDict) -> ReplyDict {
    dict.into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn tidy_settings(settings: Settings) -> Settings {
    Settings {
        new_fans_reply: settings.new_fans_reply.trim().to_string(),
        non_fans_complete_dict: tidy_dict(settings.non_fans_complete_dict),
        non_fans_keyword_dict: tidy_dict(settings.non_fans_keyword_dict),
        non_fans_other_reply: settings.non_fans_other_reply.trim().to_string(),
        fans_complete_dict: tidy_dict(settings.fans_complete_dict),
        fans_keyword_dict: tidy_dict(settings.fans_keyword_dict),
        fans_other_reply: settings.fans_other_reply.trim().to_string(),
        token_key: settings.token_key.trim().to_string(),
        ..settings
    }
    .normalized()
}

async fn save_settings(state: &AppState, settings: Settings) -> Response {
    match state.settings.save(&settings).await {
        Ok(()) => Json(serde_json::json!({ "success": true, "data": settings })).into_response(),
        Err(e) => {
            error!("Failed to save settings: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save settings")
        }
    }
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<Settings>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }
    let settings = tidy_settings(req);
    info!("设置参数已更新");
    save_settings(&state, settings).await
}

async fn reset_settings(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }
    match state.settings.reset().await {
        Ok(settings) => {
            info!("设置参数已恢复默认");
            Json(serde_json::json!({ "success": true, "data": settings })).into_response()
        }
        Err(e) => {
            error!("Failed to reset settings: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reset settings")
        }
    }
}

async fn put_login_remember(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRememberRequest>,
) -> Response {
    let mut settings = match authorize(&state, &headers).await {
        Ok(settings) => settings,
        Err(resp) => return resp,
    };
    settings.login_remember = req.login_remember;
    debug!("login_remember set to {}", req.login_remember);
    save_settings(&state, settings).await
}

// ==================== 路由 ====================

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/api/unlock", post(unlock))
        .route("/api/status", get(get_status))
        .route("/api/fans", get(get_fans))
        .route("/api/login/qrcode", get(get_login_qrcode))
        .route("/api/logs", get(get_logs))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/settings/reset", post(reset_settings))
        .route("/api/settings/login-remember", put(put_login_remember))
        .layer(cors)
        .with_state(state)
}

// ==================== 服务器启动 ====================

pub async fn start_web_server(bind_addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Web server started on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tidy_settings() {
        let mut settings = Settings::default();
        settings.fans_keyword_dict.clear();
        settings.fans_keyword_dict.insert("  价格 ".into(), " 私聊 ".into());
        settings.fans_keyword_dict.insert("   ".into(), "丢弃".into());
        settings.fans_other_reply = "  收到  ".into();
        settings.interval_seconds = 0;

        let tidy = tidy_settings(settings);
        assert_eq!(tidy.fans_keyword_dict.len(), 1);
        assert_eq!(tidy.fans_keyword_dict["价格"], "私聊");
        assert_eq!(tidy.fans_other_reply, "收到");
        assert_eq!(tidy.interval_seconds, 1);
    }
}

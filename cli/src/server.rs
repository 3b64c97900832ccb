use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use pace_core::calibration::CalibrationOutcome;
use pace_core::models::{
    AdaptiveModel, DailyLog, ExportData, GoalSettings, ImportSummary, InvalidInput, UpdateDailyLog,
    UserProfile, validate_bias, validate_export_data, validate_goal_settings, validate_profile,
};
use pace_core::service::{CoachService, DayOverview, ProgressReport};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<CoachService>>,
    api_key: Option<String>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, CoachService> {
        self.svc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct HourQuery {
    hour: Option<u32>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetBiasRequest {
    tdee_bias: i64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

fn parse_date_param(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{raw}'. Use YYYY-MM-DD")))
}

fn resolve_hour(hour: Option<u32>) -> Result<u32, ApiError> {
    match hour {
        Some(h) if h > 23 => Err(ApiError::BadRequest(
            "hour must be between 0 and 23".to_string(),
        )),
        Some(h) => Ok(h),
        None => Ok(Local::now().hour()),
    }
}

fn require_setup(svc: &CoachService) -> Result<(), ApiError> {
    if svc.get_profile()?.is_none() || svc.get_goals()?.is_none() {
        return Err(ApiError::NotFound(
            "No profile found. Complete setup first.".to_string(),
        ));
    }
    Ok(())
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Coaching handlers ---

fn overview_for(
    state: &AppState,
    date: NaiveDate,
    hour: Option<u32>,
) -> Result<Json<DayOverview>, ApiError> {
    let hour = resolve_hour(hour)?;
    let svc = state.svc();
    require_setup(&svc)?;
    let overview = svc
        .day_overview(date, hour, Utc::now())
        .context("failed to build day overview")?;
    Ok(Json(overview))
}

async fn get_today(
    State(state): State<AppState>,
    Query(q): Query<HourQuery>,
) -> Result<Json<DayOverview>, ApiError> {
    overview_for(&state, Local::now().date_naive(), q.hour)
}

async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(q): Query<HourQuery>,
) -> Result<Json<DayOverview>, ApiError> {
    let date = parse_date_param(&date)?;
    overview_for(&state, date, q.hour)
}

async fn calibrate(State(state): State<AppState>) -> Result<Json<CalibrationOutcome>, ApiError> {
    let outcome = state
        .svc()
        .calibrate(Utc::now())
        .context("failed to run calibration")?;
    Ok(Json(outcome))
}

async fn get_progress(State(state): State<AppState>) -> Result<Json<ProgressReport>, ApiError> {
    let svc = state.svc();
    require_setup(&svc)?;
    let report = svc
        .progress(Utc::now())
        .context("failed to build progress report")?;
    Ok(Json(report))
}

// --- Profile / goals / bias handlers ---

async fn get_profile(State(state): State<AppState>) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .svc()
        .get_profile()?
        .ok_or_else(|| ApiError::NotFound("No profile found".to_string()))?;
    Ok(Json(profile))
}

async fn put_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ApiError> {
    validate_profile(&profile).map_err(|e| bad_request(&e))?;
    let saved = state
        .svc()
        .set_profile(&profile)
        .context("failed to save profile")?;
    Ok(Json(saved))
}

async fn get_goals(State(state): State<AppState>) -> Result<Json<GoalSettings>, ApiError> {
    let goals = state
        .svc()
        .get_goals()?
        .ok_or_else(|| ApiError::NotFound("No goals found".to_string()))?;
    Ok(Json(goals))
}

async fn put_goals(
    State(state): State<AppState>,
    Json(mut goals): Json<GoalSettings>,
) -> Result<Json<GoalSettings>, ApiError> {
    validate_goal_settings(&goals).map_err(|e| bad_request(&e))?;
    let svc = state.svc();
    if svc.get_profile()?.is_none() {
        return Err(ApiError::BadRequest(
            "Save a profile before setting goals".to_string(),
        ));
    }
    goals.start_date.get_or_insert_with(|| Local::now().date_naive());
    let saved = svc.set_goals(&goals).context("failed to save goals")?;
    Ok(Json(saved))
}

async fn get_bias(State(state): State<AppState>) -> Result<Json<AdaptiveModel>, ApiError> {
    let model = state
        .svc()
        .get_adaptive_model()
        .context("failed to load adaptive model")?;
    Ok(Json(model))
}

async fn put_bias(
    State(state): State<AppState>,
    Json(req): Json<SetBiasRequest>,
) -> Result<Json<AdaptiveModel>, ApiError> {
    validate_bias(req.tdee_bias).map_err(|e| bad_request(&e))?;
    let model = state
        .svc()
        .set_bias(req.tdee_bias)
        .context("failed to save bias")?;
    Ok(Json(model))
}

// --- Daily log handlers ---

async fn list_logs(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<DailyLog>>, ApiError> {
    if q.limit.is_some_and(|n| n <= 0) {
        return Err(ApiError::BadRequest(
            "limit must be greater than 0".to_string(),
        ));
    }
    let logs = state.svc().get_logs(q.limit).context("failed to list logs")?;
    Ok(Json(logs))
}

async fn get_log(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailyLog>, ApiError> {
    let date = parse_date_param(&date)?;
    let log = state
        .svc()
        .get_log(date)?
        .ok_or_else(|| ApiError::NotFound(format!("No log for {date}")))?;
    Ok(Json(log))
}

async fn put_log(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(update): Json<UpdateDailyLog>,
) -> Result<Json<DailyLog>, ApiError> {
    let date = parse_date_param(&date)?;
    let today = Local::now().date_naive();
    let log = state.svc().log_day(date, &update, today).map_err(|e| {
        if e.is::<InvalidInput>() {
            bad_request(&e)
        } else {
            ApiError::Internal(e.context("failed to save daily log"))
        }
    })?;
    Ok(Json(log))
}

async fn delete_log(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<StatusCode, ApiError> {
    let date = parse_date_param(&date)?;
    if state.svc().delete_log(date)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No log for {date}")))
    }
}

// --- Export / Import handlers ---

async fn export_data(State(state): State<AppState>) -> Result<Json<ExportData>, ApiError> {
    let data = state.svc().export_all().context("failed to export data")?;
    Ok(Json(data))
}

async fn import_data(
    State(state): State<AppState>,
    Json(data): Json<ExportData>,
) -> Result<Json<ImportSummary>, ApiError> {
    validate_export_data(&data).map_err(|e| bad_request(&e))?;
    let summary = state
        .svc()
        .import_all(&data)
        .context("failed to import data")?;
    Ok(Json(summary))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(get_today))
        .route("/api/today/{date}", get(get_day))
        .route("/api/calibrate", post(calibrate))
        .route("/api/progress", get(get_progress))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/goals", get(get_goals).put(put_goals))
        .route("/api/bias", get(get_bias).put(put_bias))
        .route("/api/logs", get(list_logs))
        .route(
            "/api/logs/{date}",
            get(get_log).put(put_log).delete(delete_log),
        )
        .route("/api/export", get(export_data))
        .route("/api/import", post(import_data))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// Masked key shown at startup, e.g. `API key: abcd...wxyz`.
fn api_key_hint(key: &str) -> Option<String> {
    if key.len() < 8 || !key.is_ascii() {
        return None;
    }
    Some(format!(
        "API key: {}...{} (see api_key file in data directory)",
        &key[..4],
        &key[key.len() - 4..],
    ))
}

pub async fn start_server(
    svc: CoachService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    match api_key {
        Some(ref key) => {
            if new_api_key {
                info!("serving with a newly generated API key");
            }
            if let Some(hint) = api_key_hint(key) {
                eprintln!("{hint}");
            }
        }
        None => {
            warn!("authentication disabled");
            eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
        }
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(%bind, port, "REST API listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

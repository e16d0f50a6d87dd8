//! Dashboard, widget and settings handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{ApiError, ApiJson, AppState};
use crate::data::{SystemStatsSnapshot, WeatherSnapshot};

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /` and `GET /dashboard`
pub async fn dashboard() -> Json<Value> {
    Json(json!({ "message": "dashboard loaded", "status": "ok" }))
}

/// `GET /api/widgets/weather`
pub async fn weather_widget(
    State(state): State<AppState>,
) -> Result<Json<WeatherSnapshot>, ApiError> {
    state.weather.get().await.map(Json).map_err(|e| {
        error!(error = %e, "failed to get weather");
        ApiError::internal("failed to fetch weather")
    })
}

/// `GET /api/widgets/system`
pub async fn system_widget(
    State(state): State<AppState>,
) -> Result<Json<SystemStatsSnapshot>, ApiError> {
    if !state.config.system_stats_enabled {
        return Err(ApiError::not_found("system stats widget is disabled"));
    }
    state.stats.get().await.map(Json).map_err(|e| {
        error!(error = %e, "failed to get system stats");
        ApiError::internal("failed to fetch system stats")
    })
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UptimeResponse {
    pub uptime_seconds: u64,
    pub uptime_text: String,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub last_updated: DateTime<Utc>,
}

/// `GET /api/widgets/uptime`
pub async fn uptime_widget(
    State(state): State<AppState>,
) -> Result<Json<UptimeResponse>, ApiError> {
    if !state.config.uptime_enabled {
        return Err(ApiError::not_found("uptime widget is disabled"));
    }
    let stats = state.stats.get().await.map_err(|e| {
        error!(error = %e, "failed to get uptime");
        ApiError::internal("failed to fetch uptime")
    })?;

    let (days, hours, minutes) = split_uptime(stats.uptime_seconds);
    Ok(Json(UptimeResponse {
        uptime_seconds: stats.uptime_seconds,
        uptime_text: format_uptime(days, hours, minutes),
        days,
        hours,
        minutes,
        last_updated: stats.last_updated,
    }))
}

/// Splits seconds into whole days, hours and minutes
pub fn split_uptime(seconds: u64) -> (u64, u64, u64) {
    (
        seconds / SECS_PER_DAY,
        (seconds % SECS_PER_DAY) / SECS_PER_HOUR,
        (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE,
    )
}

/// Renders an uptime such as "1 day, 2 hours and 3 minutes"
///
/// Zero components are omitted; all zeros render as "less than a minute".
pub fn format_uptime(days: u64, hours: u64, minutes: u64) -> String {
    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| match n {
            1 => format!("1 {unit}"),
            n => format!("{n} {unit}s"),
        })
        .collect();

    match parts.as_slice() {
        [] => "less than a minute".to_string(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveWidgetRequest {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub widget_name: String,
    #[serde(default)]
    pub widget_key: String,
    #[serde(default)]
    pub value_json: String,
}

/// `POST /api/widgets/save`
///
/// `value_json` must itself be a JSON document; it is stored verbatim.
pub async fn save_widget_data(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SaveWidgetRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.user_id == 0 || req.widget_name.is_empty() || req.widget_key.is_empty() {
        return Err(ApiError::bad_request("missing required fields"));
    }
    if serde_json::from_str::<Value>(&req.value_json).is_err() {
        return Err(ApiError::bad_request("invalid JSON in value_json"));
    }

    state
        .store
        .save_widget_data(req.user_id, &req.widget_name, &req.widget_key, &req.value_json)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to save widget data");
            ApiError::internal("failed to save widget data")
        })?;

    debug!(
        user_id = req.user_id,
        widget = %req.widget_name,
        key = %req.widget_key,
        "widget data saved"
    );
    Ok(Json(json!({ "message": "widget data saved" })))
}

#[derive(Debug, Deserialize)]
pub struct WidgetDataQuery {
    pub user_id: Option<String>,
    pub widget_name: Option<String>,
    pub widget_key: Option<String>,
}

/// `GET /api/widgets/data`
pub async fn get_widget_data(
    State(state): State<AppState>,
    Query(query): Query<WidgetDataQuery>,
) -> Result<Json<Value>, ApiError> {
    let (Some(user_id), Some(widget_name), Some(widget_key)) = (
        non_empty(query.user_id),
        non_empty(query.widget_name),
        non_empty(query.widget_key),
    ) else {
        return Err(ApiError::bad_request("missing query parameters"));
    };
    let user_id = parse_user_id(&user_id)?;

    let stored = state
        .store
        .widget_data(user_id, &widget_name, &widget_key)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to read widget data");
            ApiError::internal("failed to read widget data")
        })?
        .ok_or_else(|| ApiError::not_found("widget data not found"))?;

    serde_json::from_str(&stored).map(Json).map_err(|e| {
        error!(error = %e, "stored widget data is not valid JSON");
        ApiError::internal("failed to parse widget data")
    })
}

#[derive(Debug, Deserialize)]
pub struct SettingQuery {
    pub user_id: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingBody {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// `GET /api/settings`
pub async fn get_setting(
    State(state): State<AppState>,
    Query(query): Query<SettingQuery>,
) -> Result<Json<SettingBody>, ApiError> {
    let (Some(user_id), Some(key)) = (non_empty(query.user_id), non_empty(query.key)) else {
        return Err(ApiError::bad_request("missing query parameters"));
    };
    let user_id = parse_user_id(&user_id)?;

    let value = state
        .store
        .setting(user_id, &key)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to read setting");
            ApiError::internal("failed to read setting")
        })?
        .ok_or_else(|| ApiError::not_found("setting not found"))?;

    Ok(Json(SettingBody { user_id, key, value }))
}

/// `POST /api/settings`
pub async fn save_setting(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SettingBody>,
) -> Result<Json<Value>, ApiError> {
    if req.user_id == 0 || req.key.is_empty() {
        return Err(ApiError::bad_request("missing required fields"));
    }

    state
        .store
        .save_setting(req.user_id, &req.key, &req.value)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to save setting");
            ApiError::internal("failed to save setting")
        })?;

    Ok(Json(json!({ "message": "setting saved" })))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("invalid user_id"))
}

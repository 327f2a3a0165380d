//! JSON API handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use hb_core::{Correction, DayCategory, OverrideKind, Settings, WorkingDays};

use crate::error::ApiError;
use crate::state::AppState;

/// Unauthenticated liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "hb-server" }))
}

/// Generic success envelope.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl StatusResponse {
    const fn ok(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub device_id: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Records one heartbeat minute for the requesting device.
pub async fn record_heartbeat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if request.device_id.is_empty() {
        return Err(ApiError::BadRequest("device_id cannot be empty".to_string()));
    }

    let today = Local::now().date_naive();
    let entry = state.db()?.record_heartbeat(&request.device_id, today)?;
    tracing::debug!(
        device_id = %request.device_id,
        timezone = request.timezone.as_deref().unwrap_or("unspecified"),
        minutes_today = entry.time_recorded,
        "heartbeat accepted"
    );

    Ok(Json(StatusResponse::ok("Heartbeat recorded")))
}

/// Settings as served to API clients.
#[derive(Debug, Serialize)]
pub struct SettingsPayload {
    pub device_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub working_days: Vec<u8>,
    pub daily_required_minutes: u32,
    pub daily_working_hours: f64,
}

impl From<&Settings> for SettingsPayload {
    fn from(settings: &Settings) -> Self {
        Self {
            device_id: settings.device_id.clone(),
            start_date: settings.start_date,
            end_date: settings.end_date,
            working_days: settings.working_days.indices().collect(),
            daily_required_minutes: settings.daily_required_minutes,
            daily_working_hours: settings.daily_working_hours(),
        }
    }
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsPayload>, ApiError> {
    let settings = state
        .db()?
        .settings()?
        .ok_or_else(|| ApiError::NotFound("settings not configured".to_string()))?;
    Ok(Json(SettingsPayload::from(&settings)))
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub working_days: Vec<u8>,
    #[serde(default)]
    pub daily_required_minutes: Option<u32>,
    #[serde(default)]
    pub daily_working_hours: Option<f64>,
}

/// The requirement may arrive in minutes (canonical) or hours (legacy form);
/// minutes win when both are present.
fn resolve_required_minutes(
    minutes: Option<u32>,
    hours: Option<f64>,
) -> Result<Option<u32>, ApiError> {
    if let Some(minutes) = minutes {
        return Ok(Some(minutes));
    }
    match hours {
        None => Ok(None),
        Some(hours) if hours > 0.0 && hours <= 24.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let minutes = (hours * 60.0).round() as u32;
            Ok(Some(minutes))
        }
        Some(hours) => Err(ApiError::BadRequest(format!(
            "invalid daily working hours: {hours}"
        ))),
    }
}

/// Updates settings and recomputes requirements for stored rows.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<SettingsPayload>, ApiError> {
    let today = Local::now().date_naive();
    let mut db = state.db()?;
    let current = db.settings_or_default(&state.config.device_id, today)?;

    let working_days = WorkingDays::from_indices(request.working_days)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    let daily_required_minutes =
        resolve_required_minutes(request.daily_required_minutes, request.daily_working_hours)?
            .unwrap_or(current.daily_required_minutes);

    let settings = Settings::new(
        current.device_id,
        request.start_date.unwrap_or(current.start_date),
        request.end_date.unwrap_or(current.end_date),
        working_days,
        daily_required_minutes,
    )
    .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    db.apply_settings_change(&settings)?;
    Ok(Json(SettingsPayload::from(&settings)))
}

/// One holiday/leave day as served to API clients.
#[derive(Debug, Serialize)]
pub struct HolidayPayload {
    pub date: NaiveDate,
    pub category: DayCategory,
    pub description: String,
}

pub async fn list_holidays(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HolidayPayload>>, ApiError> {
    let rows = state.db()?.overrides()?;
    let holidays = rows
        .into_iter()
        .map(|row| HolidayPayload {
            date: row.date,
            category: row.category,
            description: row.description.unwrap_or_default(),
        })
        .collect();
    Ok(Json(holidays))
}

#[derive(Debug, Deserialize)]
pub struct HolidayRequest {
    pub date: NaiveDate,
    pub description: String,
}

/// Marks a single day as a holiday.
pub async fn add_holiday(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HolidayRequest>,
) -> Result<Json<Value>, ApiError> {
    let today = Local::now().date_naive();
    let mut db = state.db()?;
    db.settings_or_default(&state.config.device_id, today)?;
    db.apply_holiday_range(
        request.date,
        request.date,
        OverrideKind::Holiday,
        &request.description,
    )?;

    Ok(Json(json!({
        "date": request.date,
        "description": request.description,
    })))
}

/// Removes a holiday/leave override, reverting the day to the calendar rule.
pub async fn delete_holiday(
    State(state): State<Arc<AppState>>,
    Path(raw_date): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date: {raw_date}")))?;

    let deleted = state.db()?.delete_holiday(date)?;
    if !deleted {
        return Err(ApiError::NotFound(format!("no holiday on {date}")));
    }
    Ok(Json(StatusResponse::ok("Holiday deleted")))
}

/// One manual correction as served to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorrectionPayload {
    pub date: NaiveDate,
    pub corrected_minutes: u32,
    #[serde(default)]
    pub reason: String,
}

pub async fn list_corrections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CorrectionPayload>>, ApiError> {
    let corrections = state.db()?.corrections()?;
    let payload = corrections
        .into_iter()
        .map(|correction| CorrectionPayload {
            date: correction.date,
            corrected_minutes: correction.corrected_minutes,
            reason: correction.reason,
        })
        .collect();
    Ok(Json(payload))
}

/// Sets (or replaces) the correction for a date.
pub async fn set_correction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CorrectionPayload>,
) -> Result<Json<CorrectionPayload>, ApiError> {
    let correction = Correction {
        date: request.date,
        corrected_minutes: request.corrected_minutes,
        reason: request.reason.trim().to_string(),
    };
    state.db()?.set_correction(&correction)?;

    Ok(Json(CorrectionPayload {
        date: correction.date,
        corrected_minutes: correction.corrected_minutes,
        reason: correction.reason,
    }))
}

/// Removes the correction for a date, restoring the raw recorded minutes.
pub async fn delete_correction(
    State(state): State<Arc<AppState>>,
    Path(raw_date): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date: {raw_date}")))?;

    let deleted = state.db()?.delete_correction(date)?;
    if !deleted {
        return Err(ApiError::NotFound(format!("no correction on {date}")));
    }
    Ok(Json(StatusResponse::ok("Correction deleted")))
}

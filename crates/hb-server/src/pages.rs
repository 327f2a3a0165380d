//! HTML pages and their form handlers.
//!
//! The pages are unauthenticated views over the same operations as the JSON
//! API; form posts mirror the API semantics and answer 303 back to the page.
//! Malformed form input is ignored with a redirect, never a crash.

use std::fmt::Write;
use std::sync::Arc;

use axum::Form;
use axum::extract::{Path, State};
use axum::response::{Html, Redirect};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use hb_core::{
    DaySummary, LedgerEntry, MonthSummary, OverrideKind, PeriodBalance, Settings, WorkingDays,
    format_balance, format_minutes, monthly_summary, months_in_span, period_balance,
};

use crate::error::ApiError;
use crate::state::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Weekday checkboxes in display order: form field name, label, index.
const WEEKDAYS: [(&str, &str, u8); 7] = [
    ("monday", "Monday", 0),
    ("tuesday", "Tuesday", 1),
    ("wednesday", "Wednesday", 2),
    ("thursday", "Thursday", 3),
    ("friday", "Friday", 4),
    ("saturday", "Saturday", 5),
    ("sunday", "Sunday", 6),
];

pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

/// Dashboard: period balance headline plus per-month calendars.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let today = Local::now().date_naive();
    let (settings, rows, corrections) = {
        let mut db = state.db()?;
        let settings = db.settings_or_default(&state.config.device_id, today)?;
        let rows = db.ledger_range(&settings.device_id, settings.start_date, settings.end_date)?;
        let corrections = db.corrections()?;
        (settings, rows, corrections)
    };

    let balance = period_balance(
        &rows,
        &corrections,
        &settings,
        settings.start_date,
        settings.end_date,
        today,
    );
    let months: Vec<MonthSummary> = months_in_span(settings.start_date, settings.end_date)
        .into_iter()
        .filter_map(|(year, month)| {
            monthly_summary(year, month, &rows, &corrections, &settings, today)
        })
        .collect();

    Ok(Html(render_dashboard(&settings, balance, &months)))
}

/// Settings page: period/requirement form, holiday form, holiday list.
pub async fn settings_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let today = Local::now().date_naive();
    let (settings, overrides) = {
        let mut db = state.db()?;
        let settings = db.settings_or_default(&state.config.device_id, today)?;
        let overrides = db.overrides()?;
        (settings, overrides)
    };
    Ok(Html(render_settings(&settings, &overrides, today)))
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub daily_working_hours: Option<String>,
    #[serde(default)]
    pub monday: Option<String>,
    #[serde(default)]
    pub tuesday: Option<String>,
    #[serde(default)]
    pub wednesday: Option<String>,
    #[serde(default)]
    pub thursday: Option<String>,
    #[serde(default)]
    pub friday: Option<String>,
    #[serde(default)]
    pub saturday: Option<String>,
    #[serde(default)]
    pub sunday: Option<String>,
}

impl SettingsForm {
    fn checked_indices(&self) -> Vec<u8> {
        [
            (0, &self.monday),
            (1, &self.tuesday),
            (2, &self.wednesday),
            (3, &self.thursday),
            (4, &self.friday),
            (5, &self.saturday),
            (6, &self.sunday),
        ]
        .into_iter()
        .filter_map(|(index, value)| value.as_ref().map(|_| index))
        .collect()
    }
}

/// Applies the settings form, then pre-populates the reporting span.
pub async fn update_settings_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, ApiError> {
    let today = Local::now().date_naive();
    let mut db = state.db()?;
    let current = db.settings_or_default(&state.config.device_id, today)?;

    let start_date = form
        .start_date
        .as_deref()
        .and_then(parse_form_date)
        .unwrap_or(current.start_date);
    let end_date = form
        .end_date
        .as_deref()
        .and_then(parse_form_date)
        .unwrap_or(current.end_date);
    let daily_required_minutes = form
        .daily_working_hours
        .as_deref()
        .and_then(parse_form_hours)
        .unwrap_or(current.daily_required_minutes);
    let working_days = WorkingDays::from_indices(form.checked_indices())
        .unwrap_or_else(|_| current.working_days.clone());

    match Settings::new(
        current.device_id,
        start_date,
        end_date,
        working_days,
        daily_required_minutes,
    ) {
        Ok(settings) => {
            db.apply_settings_change(&settings)?;
            let outcome = db.materialize_range(&settings)?;
            tracing::info!(
                created = outcome.created,
                updated = outcome.updated,
                failed = outcome.failed,
                "settings form applied"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "ignoring invalid settings form");
        }
    }

    Ok(Redirect::to("/settings"))
}

#[derive(Debug, Deserialize)]
pub struct HolidayForm {
    pub kind: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub description: String,
}

/// Applies a holiday/leave range from the settings page.
pub async fn add_holiday_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HolidayForm>,
) -> Result<Redirect, ApiError> {
    let redirect = Redirect::to("/settings");

    let Ok(kind) = form.kind.parse::<OverrideKind>() else {
        tracing::warn!(kind = %form.kind, "ignoring unknown holiday kind");
        return Ok(redirect);
    };
    let (Some(start), Some(end)) = (
        parse_form_date(&form.start_date),
        parse_form_date(&form.end_date),
    ) else {
        tracing::warn!("ignoring holiday form with malformed dates");
        return Ok(redirect);
    };
    if end < start {
        tracing::warn!(%start, %end, "ignoring inverted holiday range");
        return Ok(redirect);
    }
    // Holidays need a name; leaves fall back to their default labels.
    if kind == OverrideKind::Holiday && form.description.trim().is_empty() {
        tracing::warn!("ignoring holiday form without a description");
        return Ok(redirect);
    }

    let today = Local::now().date_naive();
    let mut db = state.db()?;
    db.settings_or_default(&state.config.device_id, today)?;
    let outcome = db.apply_holiday_range(start, end, kind, &form.description)?;
    tracing::info!(
        added = outcome.added,
        skipped = outcome.skipped,
        "holiday form applied"
    );

    Ok(redirect)
}

/// Deletes one holiday/leave day from the settings page.
pub async fn delete_holiday_form(
    State(state): State<Arc<AppState>>,
    Path(raw_date): Path<String>,
) -> Result<Redirect, ApiError> {
    if let Some(date) = parse_form_date(&raw_date) {
        state.db()?.delete_holiday(date)?;
    }
    Ok(Redirect::to("/settings"))
}

fn parse_form_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn parse_form_hours(raw: &str) -> Option<u32> {
    let hours: f64 = raw.trim().parse().ok()?;
    if hours > 0.0 && hours <= 24.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some((hours * 60.0).round() as u32)
    } else {
        None
    }
}

// ========== Rendering ==========

const STYLE: &str = "
body { font-family: sans-serif; margin: 2rem auto; max-width: 60rem; color: #222; }
nav a { margin-right: 1rem; }
h1 { margin-bottom: 0.25rem; }
.period { color: #666; }
.balance { font-size: 1.4rem; }
.balance.ahead { color: #1a7f37; }
.balance.behind { color: #d4690b; }
.month { margin-bottom: 1.5rem; }
.month h2 { margin-bottom: 0.25rem; font-size: 1.1rem; }
.totals { color: #444; font-size: 0.9rem; }
.days { display: flex; flex-wrap: wrap; gap: 2px; margin-top: 0.5rem; }
.day { width: 2rem; height: 2rem; line-height: 2rem; text-align: center;
       border: 1px solid #ccc; font-size: 0.8rem; }
.day.weekend { background: #9ca3af; }
.day.holiday { background: #d1d5db; }
.day.leave-full { background: #e5e7eb; }
.day.leave-half { background: #f3f4f6; }
.day.ahead { background: #4ade80; }
.day.behind { background: #fb923c; }
.day.today { background: #60a5fa; }
.day.future { background: #fff; color: #aaa; }
form.block { margin: 1rem 0; padding: 1rem; border: 1px solid #ddd; }
table { border-collapse: collapse; }
td, th { border: 1px solid #ddd; padding: 0.3rem 0.6rem; text-align: left; }
";

fn page_shell(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <nav><a href=\"/dashboard\">Dashboard</a><a href=\"/settings\">Settings</a></nav>\n\
         {body}\n</body>\n</html>\n"
    )
}

fn html_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn day_class(day: &DaySummary) -> &'static str {
    use hb_core::DayCategory;

    if day.is_today {
        return "today";
    }
    if day.is_future {
        return "future";
    }
    match day.category {
        DayCategory::Weekend => "weekend",
        DayCategory::Holiday => "holiday",
        DayCategory::FullLeave => "leave-full",
        DayCategory::HalfLeave => "leave-half",
        DayCategory::Workday => {
            if day.balance >= 0 {
                "ahead"
            } else {
                "behind"
            }
        }
    }
}

fn render_dashboard(
    settings: &Settings,
    balance: PeriodBalance,
    months: &[MonthSummary],
) -> String {
    let daily = settings.daily_required_minutes;
    let mut body = String::new();

    writeln!(body, "<h1>Attendance</h1>").unwrap();
    writeln!(
        body,
        "<p class=\"period\">{} to {}</p>",
        settings.start_date.format("%b %d, %Y"),
        settings.end_date.format("%b %d, %Y")
    )
    .unwrap();
    let balance_class = if balance.balance >= 0 { "ahead" } else { "behind" };
    writeln!(
        body,
        "<p class=\"balance {balance_class}\">Balance: {}</p>",
        format_balance(balance.balance, daily)
    )
    .unwrap();

    for month in months {
        writeln!(body, "<section class=\"month\">").unwrap();
        writeln!(body, "<h2>{}</h2>", html_escape(&month.label)).unwrap();
        if month.is_future {
            writeln!(body, "<p class=\"totals\">-</p>").unwrap();
        } else {
            writeln!(
                body,
                "<p class=\"totals\">recorded {} &middot; required {} &middot; balance {}</p>",
                format_balance(i64::from(month.time_recorded), daily),
                format_balance(i64::from(month.time_required), daily),
                format_balance(month.balance, daily)
            )
            .unwrap();
            writeln!(body, "<div class=\"days\">").unwrap();
            for day in &month.days {
                let title = format!(
                    "{}: {} / {}{}",
                    day.date,
                    format_minutes(i64::from(day.time_recorded)),
                    format_minutes(i64::from(day.time_required)),
                    if day.corrected { " (corrected)" } else { "" }
                );
                writeln!(
                    body,
                    "<span class=\"day {}\" title=\"{}\">{}</span>",
                    day_class(day),
                    html_escape(&title),
                    day.date.format("%-d")
                )
                .unwrap();
            }
            writeln!(body, "</div>").unwrap();
        }
        writeln!(body, "</section>").unwrap();
    }

    page_shell("Attendance", &body)
}

fn render_settings(settings: &Settings, overrides: &[LedgerEntry], today: NaiveDate) -> String {
    let mut body = String::new();

    writeln!(body, "<h1>Settings</h1>").unwrap();

    // Period, requirement, and working-day form
    writeln!(body, "<form class=\"block\" method=\"post\" action=\"/settings\">").unwrap();
    writeln!(
        body,
        "<label>Start date <input type=\"date\" name=\"start_date\" value=\"{}\"></label>",
        settings.start_date
    )
    .unwrap();
    writeln!(
        body,
        "<label>End date <input type=\"date\" name=\"end_date\" value=\"{}\"></label>",
        settings.end_date
    )
    .unwrap();
    writeln!(
        body,
        "<label>Daily working hours <input type=\"number\" step=\"0.25\" min=\"0.25\" max=\"24\" \
         name=\"daily_working_hours\" value=\"{}\"></label>",
        settings.daily_working_hours()
    )
    .unwrap();
    writeln!(body, "<fieldset><legend>Working days</legend>").unwrap();
    for (name, label, index) in WEEKDAYS {
        let checked = if settings.working_days.contains_index(index) {
            " checked"
        } else {
            ""
        };
        writeln!(
            body,
            "<label><input type=\"checkbox\" name=\"{name}\"{checked}> {label}</label>"
        )
        .unwrap();
    }
    writeln!(body, "</fieldset>").unwrap();
    writeln!(body, "<button type=\"submit\">Save settings</button>").unwrap();
    writeln!(body, "</form>").unwrap();

    // Holiday/leave form
    writeln!(body, "<form class=\"block\" method=\"post\" action=\"/holidays\">").unwrap();
    writeln!(body, "<label>Type <select name=\"kind\">").unwrap();
    writeln!(body, "<option value=\"holiday\">Holiday</option>").unwrap();
    writeln!(body, "<option value=\"full_leave\">Leave (full day)</option>").unwrap();
    writeln!(body, "<option value=\"half_leave\">Leave (half day)</option>").unwrap();
    writeln!(body, "</select></label>").unwrap();
    writeln!(
        body,
        "<label>From <input type=\"date\" name=\"start_date\" value=\"{today}\"></label>"
    )
    .unwrap();
    writeln!(
        body,
        "<label>To <input type=\"date\" name=\"end_date\" value=\"{today}\"></label>"
    )
    .unwrap();
    writeln!(
        body,
        "<label>Description <input type=\"text\" name=\"description\"></label>"
    )
    .unwrap();
    writeln!(body, "<button type=\"submit\">Add</button>").unwrap();
    writeln!(body, "</form>").unwrap();

    // Stored overrides
    writeln!(body, "<h2>Holidays and leave</h2>").unwrap();
    if overrides.is_empty() {
        writeln!(body, "<p>None recorded.</p>").unwrap();
    } else {
        writeln!(body, "<table>").unwrap();
        writeln!(
            body,
            "<tr><th>Date</th><th>Type</th><th>Description</th><th></th></tr>"
        )
        .unwrap();
        for entry in overrides {
            writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td>\
                 <td><form method=\"post\" action=\"/holidays/{}/delete\">\
                 <button type=\"submit\">Delete</button></form></td></tr>",
                entry.date,
                entry.category,
                html_escape(entry.description.as_deref().unwrap_or("")),
                entry.date
            )
            .unwrap();
        }
        writeln!(body, "</table>").unwrap();
    }

    page_shell("Settings", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    use hb_core::DayCategory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_settings() -> Settings {
        Settings::new(
            "dev-1",
            date(2024, 6, 1),
            date(2024, 6, 30),
            WorkingDays::default(),
            480,
        )
        .unwrap()
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(html_escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn form_date_parsing_is_lenient() {
        assert_eq!(parse_form_date(" 2024-06-03 "), Some(date(2024, 6, 3)));
        assert_eq!(parse_form_date("03/06/2024"), None);
        assert_eq!(parse_form_date(""), None);
    }

    #[test]
    fn form_hours_reject_nonsense() {
        assert_eq!(parse_form_hours("7.5"), Some(450));
        assert_eq!(parse_form_hours("0"), None);
        assert_eq!(parse_form_hours("-2"), None);
        assert_eq!(parse_form_hours("abc"), None);
    }

    #[test]
    fn day_classes_follow_category_and_balance() {
        let mut day = DaySummary {
            date: date(2024, 6, 3),
            category: DayCategory::Workday,
            time_recorded: 480,
            time_required: 480,
            balance: 0,
            corrected: false,
            is_today: false,
            is_future: false,
            description: None,
        };
        assert_eq!(day_class(&day), "ahead");
        day.balance = -1;
        assert_eq!(day_class(&day), "behind");
        day.is_today = true;
        assert_eq!(day_class(&day), "today");
        day.is_today = false;
        day.category = DayCategory::Holiday;
        assert_eq!(day_class(&day), "holiday");
    }

    #[test]
    fn dashboard_renders_balance_and_months() {
        let settings = sample_settings();
        let months = vec![
            monthly_summary(2024, 6, &[], &[], &settings, date(2024, 6, 12)).unwrap(),
        ];
        let balance = PeriodBalance {
            time_recorded: 600,
            time_required: 480,
            balance: 120,
        };
        let html = render_dashboard(&settings, balance, &months);
        assert!(html.contains("June 2024"));
        assert!(html.contains("Balance: 02:00"));
        assert!(html.contains("class=\"balance ahead\""));
    }

    #[test]
    fn settings_page_lists_overrides() {
        let overrides = vec![LedgerEntry {
            device_id: "dev-1".to_string(),
            date: date(2024, 6, 5),
            category: DayCategory::Holiday,
            time_recorded: 0,
            time_required: 0,
            description: Some("Founders <Day>".to_string()),
        }];
        let html = render_settings(&sample_settings(), &overrides, date(2024, 6, 12));
        assert!(html.contains("2024-06-05"));
        assert!(html.contains("Founders &lt;Day&gt;"));
        assert!(html.contains("/holidays/2024-06-05/delete"));
    }

    #[test]
    fn checked_indices_collects_marked_days() {
        let form = SettingsForm {
            start_date: None,
            end_date: None,
            daily_working_hours: None,
            monday: Some("on".to_string()),
            tuesday: None,
            wednesday: Some("on".to_string()),
            thursday: None,
            friday: None,
            saturday: None,
            sunday: Some("on".to_string()),
        };
        assert_eq!(form.checked_indices(), vec![0, 2, 6]);
    }
}

//! Delivery schedule route handlers.
//!
//! The weekly schedule is edited as one form and saved as a whole. Rows are
//! indexed (`weekday_0`, `starts_0`, ...); rows with no start time are dropped.

use askama::Template;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use tracing::instrument;

use carniceria_core::{DeliverySlot, DeliverySlotDraft, weekday_from_iso, weekday_label};

use crate::db::DeliveryRepository;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{AdminUserView, Fields, render};

/// Blank rows offered below the saved slots.
const BLANK_ROWS: usize = 2;

/// Upper bound on rows read from one submission.
const MAX_ROWS: usize = 50;

/// A weekday choice for the select box.
#[derive(Debug, Clone)]
pub struct WeekdayChoice {
    pub value: u32,
    pub label: &'static str,
    pub selected: bool,
}

/// One editable schedule row.
#[derive(Debug, Clone)]
pub struct SlotRow {
    pub index: usize,
    pub weekdays: Vec<WeekdayChoice>,
    pub starts_at: String,
    pub ends_at: String,
    pub active: bool,
    pub max_orders: String,
}

impl SlotRow {
    fn new(
        index: usize,
        weekday: Weekday,
        starts_at: String,
        ends_at: String,
        active: bool,
        max_orders: String,
    ) -> Self {
        Self {
            index,
            weekdays: (1..=7)
                .filter_map(weekday_from_iso)
                .map(|day| WeekdayChoice {
                    value: day.number_from_monday(),
                    label: weekday_label(day),
                    selected: day == weekday,
                })
                .collect(),
            starts_at,
            ends_at,
            active,
            max_orders,
        }
    }

    fn blank(index: usize) -> Self {
        Self::new(index, Weekday::Mon, String::new(), String::new(), true, String::new())
    }
}

fn rows_for(slots: &[DeliverySlot]) -> Vec<SlotRow> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            SlotRow::new(
                i,
                slot.weekday,
                slot.starts_at.format("%H:%M").to_string(),
                slot.ends_at.format("%H:%M").to_string(),
                slot.active,
                slot.max_orders.map(|n| n.to_string()).unwrap_or_default(),
            )
        })
        .chain((slots.len()..slots.len() + BLANK_ROWS).map(SlotRow::blank))
        .collect()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Read the schedule rows from the form.
///
/// # Errors
///
/// Returns a Spanish message naming the first invalid row.
pub fn parse_schedule(fields: &Fields) -> Result<Vec<DeliverySlotDraft>, String> {
    let mut drafts = Vec::new();

    for i in 0..MAX_ROWS {
        let starts = fields.get(&format!("starts_{i}"));
        if starts.is_empty() {
            continue;
        }
        let row = i + 1;
        let weekday = fields
            .get(&format!("weekday_{i}"))
            .parse::<i16>()
            .ok()
            .and_then(weekday_from_iso)
            .ok_or_else(|| format!("Fila {row}: elegí un día"))?;
        let starts_at =
            parse_time(starts).ok_or_else(|| format!("Fila {row}: hora de inicio inválida"))?;
        let ends_at = parse_time(fields.get(&format!("ends_{i}")))
            .ok_or_else(|| format!("Fila {row}: hora de fin inválida"))?;
        let max_orders = match fields.get(&format!("max_{i}")) {
            "" => None,
            raw => Some(
                raw.parse::<u32>()
                    .map_err(|_| format!("Fila {row}: el cupo debe ser un número"))?,
            ),
        };

        let draft = DeliverySlotDraft {
            weekday,
            starts_at,
            ends_at,
            active: fields.checked(&format!("active_{i}")),
            max_orders,
        };
        draft
            .validate()
            .map_err(|_| format!("Fila {row}: el horario termina antes de empezar"))?;
        drafts.push(draft);
    }

    Ok(drafts)
}

/// Delivery schedule page template.
#[derive(Template)]
#[template(path = "admin/delivery.html")]
pub struct DeliveryTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub rows: Vec<SlotRow>,
    pub error: Option<String>,
    pub saved: bool,
}

/// Query parameters for the schedule page.
#[derive(Debug, Deserialize)]
pub struct SavedQuery {
    pub saved: Option<String>,
}

/// Delivery schedule page handler.
#[instrument(skip(admin, state))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<SavedQuery>,
) -> Response {
    let (rows, error) = match DeliveryRepository::new(state.pool()).list().await {
        Ok(slots) => (rows_for(&slots), None),
        Err(e) => {
            tracing::error!("Failed to fetch delivery slots: {e}");
            (rows_for(&[]), Some("No se pudieron cargar los horarios".to_string()))
        }
    };

    render(&DeliveryTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/delivery".to_string(),
        rows,
        error,
        saved: query.saved.is_some(),
    })
}

/// Replace the delivery schedule.
#[instrument(skip(admin, state, fields))]
pub async fn save(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let fields = Fields(fields);
    let drafts = match parse_schedule(&fields) {
        Ok(drafts) => drafts,
        Err(message) => {
            let slots = DeliveryRepository::new(state.pool())
                .list()
                .await
                .unwrap_or_default();
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&DeliveryTemplate {
                    admin_user: AdminUserView::from(&admin),
                    current_path: "/admin/delivery".to_string(),
                    rows: rows_for(&slots),
                    error: Some(message),
                    saved: false,
                }),
            )
                .into_response();
        }
    };

    match DeliveryRepository::new(state.pool())
        .replace_all(&drafts)
        .await
    {
        Ok(slots) => {
            tracing::info!(slots = slots.len(), "Delivery schedule replaced");
            Redirect::to("/admin/delivery?saved=1").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save delivery schedule");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "No se pudieron guardar los horarios",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        Fields(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_parse_schedule_skips_blank_rows() {
        let drafts = parse_schedule(&fields(&[
            ("weekday_0", "2"),
            ("starts_0", "09:00"),
            ("ends_0", "13:00"),
            ("active_0", "on"),
            ("max_0", "20"),
            ("weekday_1", "1"),
            ("starts_1", ""),
            ("ends_1", ""),
            ("weekday_2", "6"),
            ("starts_2", "10:00"),
            ("ends_2", "12:30"),
        ]))
        .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].weekday, Weekday::Tue);
        assert_eq!(drafts[0].max_orders, Some(20));
        assert!(drafts[0].active);
        assert_eq!(drafts[1].weekday, Weekday::Sat);
        assert!(!drafts[1].active);
    }

    #[test]
    fn test_parse_schedule_rejects_inverted_window() {
        let err = parse_schedule(&fields(&[
            ("weekday_0", "3"),
            ("starts_0", "14:00"),
            ("ends_0", "09:00"),
        ]))
        .unwrap_err();
        assert!(err.starts_with("Fila 1"));
    }

    #[test]
    fn test_rows_for_adds_blank_rows() {
        let rows = rows_for(&[]);
        assert_eq!(rows.len(), BLANK_ROWS);
        assert!(rows.iter().all(|r| r.starts_at.is_empty()));
    }
}

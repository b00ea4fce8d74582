//! Delivery windows and next-delivery computation.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::id::DeliverySlotId;

/// A weekly delivery window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySlot {
    pub id: DeliverySlotId,
    pub weekday: Weekday,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub active: bool,
    /// Shown to staff only; not enforced at checkout.
    pub max_orders: Option<u32>,
}

/// A delivery window before it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySlotDraft {
    pub weekday: Weekday,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub active: bool,
    pub max_orders: Option<u32>,
}

/// Invalid delivery schedule.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("window on {weekday} ends at {ends_at} before it starts at {starts_at}")]
    EndsBeforeStart {
        weekday: &'static str,
        starts_at: NaiveTime,
        ends_at: NaiveTime,
    },
}

impl DeliverySlotDraft {
    /// Check that the window is not empty or inverted.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::EndsBeforeStart`] when `ends_at <= starts_at`.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.ends_at <= self.starts_at {
            return Err(ScheduleError::EndsBeforeStart {
                weekday: weekday_label(self.weekday),
                starts_at: self.starts_at,
                ends_at: self.ends_at,
            });
        }
        Ok(())
    }
}

/// The upcoming delivery window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextDelivery {
    pub slot_id: DeliverySlotId,
    pub date: NaiveDate,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    /// The window has already started but not yet ended.
    pub in_progress: bool,
}

impl NextDelivery {
    /// Spanish text for banners, e.g. `Martes 14/10, de 09:00 a 13:00`.
    #[must_use]
    pub fn describe(&self) -> String {
        let prefix = if self.in_progress {
            "Hoy, en curso"
        } else {
            weekday_label(self.date.weekday())
        };
        format!(
            "{prefix} {}, de {} a {}",
            self.date.format("%d/%m"),
            self.starts_at.format("%H:%M"),
            self.ends_at.format("%H:%M"),
        )
    }
}

/// Find the earliest active window that has not ended yet.
///
/// `now` is the shop's local time. Looks at most seven days ahead, so a
/// window on today's weekday that already ended is found again next week.
#[must_use]
pub fn next_delivery(slots: &[DeliverySlot], now: NaiveDateTime) -> Option<NextDelivery> {
    let today = now.date();
    (0..=7u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .flat_map(|date| {
            slots
                .iter()
                .filter(move |slot| slot.active && slot.weekday == date.weekday())
                .map(move |slot| (date, slot))
        })
        .filter(|(date, slot)| date.and_time(slot.ends_at) > now)
        .min_by_key(|(date, slot)| (date.and_time(slot.starts_at), slot.id.as_i32()))
        .map(|(date, slot)| NextDelivery {
            slot_id: slot.id,
            date,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            in_progress: date.and_time(slot.starts_at) <= now,
        })
}

/// Spanish weekday name.
#[must_use]
pub const fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Lunes",
        Weekday::Tue => "Martes",
        Weekday::Wed => "Miércoles",
        Weekday::Thu => "Jueves",
        Weekday::Fri => "Viernes",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

/// Weekday from its ISO number (1 = Monday).
#[must_use]
pub fn weekday_from_iso(n: i16) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn slot(id: i32, weekday: Weekday, from: u32, to: u32, active: bool) -> DeliverySlot {
        DeliverySlot {
            id: DeliverySlotId::new(id),
            weekday,
            starts_at: NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
            ends_at: NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
            active,
            max_orders: None,
        }
    }

    // 2026-10-13 is a Tuesday.
    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_no_active_slots() {
        assert_eq!(next_delivery(&[], at(13, 8)), None);
        let inactive = [slot(1, Weekday::Tue, 9, 13, false)];
        assert_eq!(next_delivery(&inactive, at(13, 8)), None);
    }

    #[test]
    fn test_later_today_wins() {
        let slots = [slot(1, Weekday::Thu, 9, 13, true), slot(2, Weekday::Tue, 16, 20, true)];
        let next = next_delivery(&slots, at(13, 10)).unwrap();
        assert_eq!(next.slot_id, DeliverySlotId::new(2));
        assert_eq!(next.date, NaiveDate::from_ymd_opt(2026, 10, 13).unwrap());
        assert!(!next.in_progress);
    }

    #[test]
    fn test_window_in_progress_counts() {
        let slots = [slot(1, Weekday::Tue, 9, 13, true)];
        let next = next_delivery(&slots, at(13, 11)).unwrap();
        assert!(next.in_progress);
        assert!(next.describe().starts_with("Hoy, en curso"));
    }

    #[test]
    fn test_ended_window_rolls_to_next_week() {
        let slots = [slot(1, Weekday::Tue, 9, 13, true)];
        let next = next_delivery(&slots, at(13, 14)).unwrap();
        assert_eq!(next.date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert_eq!(next.describe(), "Martes 20/10, de 09:00 a 13:00");
    }

    #[test]
    fn test_draft_rejects_inverted_window() {
        let draft = DeliverySlotDraft {
            weekday: Weekday::Sat,
            starts_at: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            ends_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            active: true,
            max_orders: None,
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_weekday_iso_numbers() {
        assert_eq!(weekday_from_iso(1), Some(Weekday::Mon));
        assert_eq!(weekday_from_iso(7), Some(Weekday::Sun));
        assert_eq!(weekday_from_iso(0), None);
    }
}

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::SqlitePool;

use crate::db;

pub const TIME_FORMAT: &str = "%H:%M";

/// Daily slots from `start` to `end` inclusive, every `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCatalog {
    start: NaiveTime,
    end: NaiveTime,
    step: Duration,
}

impl SlotCatalog {
    pub fn new(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Result<Self, String> {
        if step_minutes == 0 {
            return Err("slot step must be at least one minute".to_string());
        }
        if start > end {
            return Err(format!(
                "slot start {} is after slot end {}",
                start.format(TIME_FORMAT),
                end.format(TIME_FORMAT)
            ));
        }
        Ok(Self {
            start,
            end,
            step: Duration::minutes(i64::from(step_minutes)),
        })
    }

    pub fn times(&self) -> Vec<NaiveTime> {
        let mut times = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            times.push(current);
            let (next, wrapped) = current.overflowing_add_signed(self.step);
            if wrapped != 0 || next <= current {
                break;
            }
            current = next;
        }
        times
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if time < self.start || time > self.end {
            return false;
        }
        let offset = (time - self.start).num_seconds();
        offset % self.step.num_seconds() == 0
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(16, 30, 0).unwrap_or_default(),
            step: Duration::minutes(30),
        }
    }
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Catalog order is kept; booked times that are not catalog slots are ignored.
pub fn subtract_booked(catalog: &SlotCatalog, booked: &[NaiveTime]) -> Vec<NaiveTime> {
    let booked: HashSet<NaiveTime> = booked.iter().copied().collect();
    catalog
        .times()
        .into_iter()
        .filter(|time| !booked.contains(time))
        .collect()
}

pub async fn available_slots(
    pool: &SqlitePool,
    catalog: &SlotCatalog,
    barber_id: i64,
    date: NaiveDate,
) -> Result<Vec<NaiveTime>, sqlx::Error> {
    let booked = db::confirmed_times(pool, barber_id, date)
        .await?
        .iter()
        .filter_map(|raw| parse_time(raw))
        .collect::<Vec<_>>();
    Ok(subtract_booked(catalog, &booked))
}

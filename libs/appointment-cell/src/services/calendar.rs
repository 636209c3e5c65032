// libs/appointment-cell/src/services/calendar.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use tracing::{debug, instrument, warn};

use shared_config::AppConfig;

use crate::clock::Clock;
use crate::models::{
    parse_wall_clock, AppointmentError, AppointmentQuery, DayPeriod, DaySchedule,
    SchedulingConfig, SlotAvailability, SlotWindow,
};
use crate::services::store::ClinicStore;
use crate::services::ClinicContext;

const DEFAULT_INTERVAL_MINUTES: i64 = 30;
const DEFAULT_REVISION_MINUTES: i64 = 30;
const DEFAULT_STANDARD_MINUTES: i64 = 60;

// ==============================================================================
// SLOT GRID
// ==============================================================================

impl Default for SchedulingConfig {
    /// Morning 08:00-11:30 and afternoon 13:00-14:30, every 30 minutes.
    fn default() -> Self {
        Self {
            windows: vec![
                window(8, 0, 11, 30),
                window(13, 0, 14, 30),
            ],
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            revision_minutes: DEFAULT_REVISION_MINUTES,
            standard_minutes: DEFAULT_STANDARD_MINUTES,
        }
    }
}

fn window(h1: u32, m1: u32, h2: u32, m2: u32) -> SlotWindow {
    SlotWindow {
        first: NaiveTime::from_hms_opt(h1, m1, 0).unwrap_or(NaiveTime::MIN),
        last: NaiveTime::from_hms_opt(h2, m2, 0).unwrap_or(NaiveTime::MIN),
    }
}

impl SchedulingConfig {
    /// Applies the `CLINIC_*` overrides on top of the defaults. Values that do
    /// not parse are logged and ignored.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let defaults = Self::default();

        let windows = match config.clinic_slot_grid.as_deref() {
            Some(raw) => parse_slot_grid(raw).unwrap_or_else(|| {
                warn!("CLINIC_SLOT_GRID '{}' is not valid, using the default grid", raw);
                defaults.windows.clone()
            }),
            None => defaults.windows.clone(),
        };

        let positive = |value: Option<i64>, name: &str, fallback: i64| match value {
            Some(v) if v > 0 => v,
            Some(v) => {
                warn!("{} must be positive, got {}", name, v);
                fallback
            }
            None => fallback,
        };

        Self {
            windows,
            interval_minutes: positive(
                config.clinic_slot_interval_minutes,
                "CLINIC_SLOT_INTERVAL_MINUTES",
                defaults.interval_minutes,
            ),
            revision_minutes: positive(
                config.clinic_revision_minutes,
                "CLINIC_REVISION_MINUTES",
                defaults.revision_minutes,
            ),
            standard_minutes: positive(
                config.clinic_standard_minutes,
                "CLINIC_STANDARD_MINUTES",
                defaults.standard_minutes,
            ),
        }
    }

    /// Every bookable start time of a day, ascending.
    pub fn slot_grid(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(self.interval_minutes.max(1));
        let mut slots = Vec::new();

        for window in &self.windows {
            let mut current = window.first;
            while current <= window.last {
                slots.push(current);
                let (next, wrapped) = current.overflowing_add_signed(step);
                if wrapped != 0 {
                    break;
                }
                current = next;
            }
        }

        slots.sort();
        slots.dedup();
        slots
    }

    pub fn is_grid_slot(&self, start: NaiveTime) -> bool {
        self.slot_grid().contains(&start)
    }
}

/// Parses `08:00-11:30,13:00-14:30`.
pub fn parse_slot_grid(raw: &str) -> Option<Vec<SlotWindow>> {
    let windows = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (first, last) = part.split_once('-')?;
            let window = SlotWindow {
                first: parse_wall_clock(first)?,
                last: parse_wall_clock(last)?,
            };
            (window.first <= window.last).then_some(window)
        })
        .collect::<Option<Vec<_>>>()?;

    (!windows.is_empty()).then_some(windows)
}

/// Days the clinic takes bookings for: today onwards, Monday to Friday.
pub fn is_offerable_date(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today && !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Marks each grid slot busy when a pending appointment starts at it.
pub fn mark_slots(grid: &[NaiveTime], occupied: &HashSet<NaiveTime>) -> Vec<SlotAvailability> {
    grid.iter()
        .map(|&start| SlotAvailability {
            start,
            period: DayPeriod::of(start),
            available: !occupied.contains(&start),
        })
        .collect()
}

// ==============================================================================
// SLOT CALENDAR SERVICE
// ==============================================================================

pub struct SlotCalendarService {
    store: Arc<dyn ClinicStore>,
    clock: Arc<dyn Clock>,
    scheduling: SchedulingConfig,
}

impl SlotCalendarService {
    pub fn new(context: &ClinicContext) -> Self {
        Self {
            store: Arc::clone(&context.store),
            clock: Arc::clone(&context.clock),
            scheduling: context.scheduling.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn available_slots(
        &self,
        dentist_id: &str,
        date: NaiveDate,
    ) -> Result<DaySchedule, AppointmentError> {
        let dentist_id = dentist_id.trim();
        if dentist_id.is_empty() {
            return Err(AppointmentError::DentistRequired);
        }

        if !is_offerable_date(date, self.clock.today()) {
            return Err(AppointmentError::InvalidDate(date));
        }

        let pending = self.store
            .list_appointments(&AppointmentQuery::pending_for(dentist_id, date))
            .await?;

        let occupied: HashSet<NaiveTime> = pending
            .iter()
            .map(|record| record.appointment.start_time)
            .collect();

        let slots = mark_slots(&self.scheduling.slot_grid(), &occupied);
        debug!(
            "{} of {} slots free for dentist {} on {}",
            slots.iter().filter(|s| s.available).count(),
            slots.len(),
            dentist_id,
            date
        );

        Ok(DaySchedule {
            dentist_id: dentist_id.to_string(),
            date,
            slots,
        })
    }

    /// The next `count` offerable dates, starting today.
    pub fn offerable_dates(&self, count: usize) -> Vec<NaiveDate> {
        let today = self.clock.today();
        today
            .iter_days()
            .filter(|date| is_offerable_date(*date, today))
            .take(count)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_grid_has_twelve_slots() {
        let grid = SchedulingConfig::default().slot_grid();
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.first(), Some(&time(8, 0)));
        assert_eq!(grid.last(), Some(&time(14, 30)));
        assert!(grid.contains(&time(11, 30)));
        assert!(!grid.contains(&time(12, 0)));
    }

    #[test]
    fn grid_rejects_off_interval_times() {
        let config = SchedulingConfig::default();
        assert!(config.is_grid_slot(time(9, 30)));
        assert!(!config.is_grid_slot(time(9, 15)));
        assert!(!config.is_grid_slot(time(15, 0)));
    }

    #[test]
    fn overrides_come_from_app_config() {
        let app = AppConfig {
            clinic_slot_grid: Some("08:00-11:00, 12:30-15:30".to_string()),
            clinic_slot_interval_minutes: Some(60),
            clinic_revision_minutes: Some(-5),
            ..AppConfig::default()
        };
        let config = SchedulingConfig::from_app_config(&app);

        assert_eq!(config.windows.len(), 2);
        assert_eq!(config.interval_minutes, 60);
        assert_eq!(config.revision_minutes, DEFAULT_REVISION_MINUTES);
        assert_eq!(
            config.slot_grid(),
            vec![time(8, 0), time(9, 0), time(10, 0), time(11, 0), time(12, 30), time(13, 30), time(14, 30), time(15, 30)]
        );
    }

    #[test]
    fn malformed_grid_falls_back_to_default() {
        assert!(parse_slot_grid("08:00").is_none());
        assert!(parse_slot_grid("11:00-08:00").is_none());
        assert!(parse_slot_grid("").is_none());

        let app = AppConfig {
            clinic_slot_grid: Some("mornings".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(SchedulingConfig::from_app_config(&app).windows, SchedulingConfig::default().windows);
    }

    #[test]
    fn weekends_and_past_days_are_not_offerable() {
        let today = date(2026, 10, 14); // Wednesday
        assert!(is_offerable_date(today, today));
        assert!(is_offerable_date(date(2026, 10, 16), today));
        assert!(!is_offerable_date(date(2026, 10, 17), today));
        assert!(!is_offerable_date(date(2026, 10, 18), today));
        assert!(!is_offerable_date(date(2026, 10, 13), today));
    }

    #[test]
    fn only_exact_start_times_are_busy() {
        let grid = SchedulingConfig::default().slot_grid();
        let occupied: HashSet<NaiveTime> = [time(9, 0), time(13, 0)].into_iter().collect();

        let slots = mark_slots(&grid, &occupied);
        let busy: Vec<NaiveTime> = slots.iter().filter(|s| !s.available).map(|s| s.start).collect();

        assert_eq!(busy, vec![time(9, 0), time(13, 0)]);
        assert!(slots.iter().find(|s| s.start == time(9, 30)).unwrap().available);
        assert_eq!(slots.iter().find(|s| s.start == time(13, 0)).unwrap().period, DayPeriod::Afternoon);
    }
}

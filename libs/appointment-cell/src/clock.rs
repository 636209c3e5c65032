use chrono::{Local, NaiveDate};

/// Source of the clinic's current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Server local date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

use chrono::{Datelike, Local, NaiveDate, Weekday};

/// Source of "today" in the host's local timezone
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn weekday(&self) -> Weekday {
        self.today().weekday()
    }
}

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

/// `YYYYMMDD` date stamp used by dated snapshot URLs
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

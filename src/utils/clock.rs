use chrono::{Local, NaiveDateTime};

/// Represents an entity responsible for providing the wall-clock time across the application.
/// Windows are aligned to human calendar minutes, so this is always local time and never a
/// monotonic instant. Tests substitute their own implementation.
pub trait Clock: Sync + Send + 'static {
    fn local_time(&self) -> NaiveDateTime;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn local_time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

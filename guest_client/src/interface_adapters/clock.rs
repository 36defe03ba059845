use chrono::Local;

use crate::domain::ports::Clock;

// Device clock; guest quota days follow the local calendar.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today_key(&self) -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }
}

mod alarm;
mod timer;
mod weekday;

pub use alarm::Alarm;
pub use timer::{format_hms, Timer};
pub use weekday::WeekdaySet;

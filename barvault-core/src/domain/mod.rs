//! Domain types for barvault.

pub mod bar;
pub mod market;
pub mod series;

pub use bar::BarRecord;
pub use market::{Exchange, Interval, ParseEnumError, BAR_INTERVALS};
pub use series::{SeriesKey, SeriesOverview};

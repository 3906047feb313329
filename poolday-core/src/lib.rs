//! Scheduling and offline sync core for poolday.
//!
//! This crate holds the parts of the field-service app with real logic:
//! - `time_window` / `date_range`: fixed-offset civil days and calendar view ranges
//! - `recurrence` / `series`: recurring appointment series, expansion and scoped edits
//! - `calendar_index`: bucketing appointments into days for a view
//! - `queue` / `sync`: the technician's offline write queue and its reconciliation
//! - `remote`: the remote store contracts and the provider client that implements them

pub mod appointment;
pub mod calendar_index;
pub mod config;
pub mod constants;
pub mod date_range;
pub mod error;
pub mod queue;
pub mod recurrence;
pub mod remote;
pub mod series;
pub mod sync;
pub mod time_window;

pub use appointment::{Appointment, AppointmentFields, AppointmentStatus};
pub use date_range::DayRange;
pub use error::{PoolDayError, PoolDayResult};
pub use time_window::{CalendarDay, CalendarViewWindow, TimeWindow, ViewKind};

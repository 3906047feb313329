//! Defines the JSON protocol spoken between poolday and remote provider
//! binaries over stdin/stdout: one request line in, one response out.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::appointment::Appointment;
use crate::queue::ServiceRecordPayload;
use crate::recurrence::RecurrenceSeries;
use crate::time_window::CalendarDay;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListAppointments,
    CreateAppointment,
    UpdateAppointment,
    DeleteAppointment,
    CreateSeries,
    UpdateSeriesEndDate,
    UpdateSeriesExceptions,
    DeleteSeries,
    UpsertServiceRecord,
}

/// Request sent from poolday to the provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from the provider to poolday.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        /// The store understood the request and refused it (validation).
        /// Anything else is treated as the store being unreachable.
        #[serde(default)]
        rejected: bool,
    },
}

/// Appointments whose date falls in `[from, to]`, ordered by date then time.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListAppointments {
    pub from: CalendarDay,
    pub to: CalendarDay,
}

impl ProviderCommand for ListAppointments {
    type Response = Vec<Appointment>;
    fn command() -> Command {
        Command::ListAppointments
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub appointment: Appointment,
}

impl ProviderCommand for CreateAppointment {
    type Response = Appointment;
    fn command() -> Command {
        Command::CreateAppointment
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAppointment {
    pub id: String,
    pub appointment: Appointment,
}

impl ProviderCommand for UpdateAppointment {
    type Response = Appointment;
    fn command() -> Command {
        Command::UpdateAppointment
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAppointment {
    pub id: String,
}

impl ProviderCommand for DeleteAppointment {
    type Response = ();
    fn command() -> Command {
        Command::DeleteAppointment
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSeries {
    pub series: RecurrenceSeries,
}

impl ProviderCommand for CreateSeries {
    type Response = ();
    fn command() -> Command {
        Command::CreateSeries
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSeriesEndDate {
    pub id: String,
    /// `None` makes the series open-ended
    pub end: Option<CalendarDay>,
}

impl ProviderCommand for UpdateSeriesEndDate {
    type Response = ();
    fn command() -> Command {
        Command::UpdateSeriesEndDate
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSeriesExceptions {
    pub id: String,
    pub exceptions: BTreeSet<CalendarDay>,
}

impl ProviderCommand for UpdateSeriesExceptions {
    type Response = ();
    fn command() -> Command {
        Command::UpdateSeriesExceptions
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSeries {
    pub id: String,
}

impl ProviderCommand for DeleteSeries {
    type Response = ();
    fn command() -> Command {
        Command::DeleteSeries
    }
}

/// Insert-or-replace keyed by `client_id`; replays must not duplicate.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertServiceRecord {
    pub client_id: String,
    pub payload: ServiceRecordPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReceipt {
    pub committed: bool,
}

impl ProviderCommand for UpsertServiceRecord {
    type Response = UpsertReceipt;
    fn command() -> Command {
        Command::UpsertServiceRecord
    }
}

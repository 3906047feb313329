//! Appointment types.
//!
//! An appointment is one visit on one civil day. Appointments that belong to a
//! recurring series carry the series id and their ordinal within it; the date
//! of such an appointment is always a generated occurrence of its series.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::time_window::CalendarDay;

/// A scheduled service visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub date: CalendarDay,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    // Series membership
    /// Owning series, `None` for a standalone appointment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    /// Ordinal of this occurrence within its series (0 = the anchor day)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_position: Option<u32>,
    /// Last day of the owning series, mirrored for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<CalendarDay>,
}

impl Appointment {
    pub fn is_recurring(&self) -> bool {
        self.series_id.is_some()
    }

    /// Drop series membership, turning this into a standalone appointment.
    pub fn detach(&mut self) {
        self.series_id = None;
        self.series_position = None;
        self.recurrence_end_date = None;
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date,
            self.time.format("%H:%M"),
            self.customer_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in-progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The per-occurrence fields a series stamps onto each materialized appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentTemplate {
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub customer_id: String,
    #[serde(default)]
    pub technician_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentTemplate {
    /// Build a scheduled appointment for `date` from this template.
    pub fn instantiate(&self, id: String, date: CalendarDay) -> Appointment {
        Appointment {
            id,
            date,
            time: self.time,
            duration_minutes: self.duration_minutes,
            status: AppointmentStatus::Scheduled,
            customer_id: self.customer_id.clone(),
            technician_id: self.technician_id.clone(),
            notes: self.notes.clone(),
            series_id: None,
            series_position: None,
            recurrence_end_date: None,
        }
    }
}

/// A partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<CalendarDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AppointmentFields {
    pub fn moves_date(&self) -> bool {
        self.date.is_some()
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(date) = self.date {
            appointment.date = date;
        }
        if let Some(time) = self.time {
            appointment.time = time;
        }
        if let Some(duration) = self.duration_minutes {
            appointment.duration_minutes = duration;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(customer_id) = &self.customer_id {
            appointment.customer_id = customer_id.clone();
        }
        if let Some(technician_id) = &self.technician_id {
            appointment.technician_id = Some(technician_id.clone());
        }
        if let Some(notes) = &self.notes {
            appointment.notes = Some(notes.clone());
        }
    }
}

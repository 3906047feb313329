//! Remote stores: the contracts the core depends on, and the provider-backed
//! client that implements them.

pub mod protocol;
pub mod provider;

use std::collections::BTreeSet;
use std::future::Future;

use crate::appointment::Appointment;
use crate::date_range::DayRange;
use crate::error::PoolDayResult;
use crate::queue::ServiceRecordPayload;
use crate::recurrence::RecurrenceSeries;
use crate::remote::protocol::{
    CreateAppointment, CreateSeries, DeleteAppointment, DeleteSeries, ListAppointments,
    UpdateAppointment, UpdateSeriesEndDate, UpdateSeriesExceptions, UpsertServiceRecord,
};
use crate::time_window::CalendarDay;

pub use protocol::UpsertReceipt;
pub use provider::Provider;

/// Where appointments and series live.
pub trait AppointmentStore: Send + Sync {
    /// Appointments dated within `range`, ordered by `(date, time)`.
    fn list_appointments(
        &self,
        range: DayRange,
    ) -> impl Future<Output = PoolDayResult<Vec<Appointment>>> + Send;

    fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> impl Future<Output = PoolDayResult<Appointment>> + Send;

    fn update_appointment(
        &self,
        id: &str,
        appointment: &Appointment,
    ) -> impl Future<Output = PoolDayResult<Appointment>> + Send;

    fn delete_appointment(&self, id: &str) -> impl Future<Output = PoolDayResult<()>> + Send;

    fn create_series(
        &self,
        series: &RecurrenceSeries,
    ) -> impl Future<Output = PoolDayResult<()>> + Send;

    fn update_series_end_date(
        &self,
        id: &str,
        end: Option<CalendarDay>,
    ) -> impl Future<Output = PoolDayResult<()>> + Send;

    fn update_series_exceptions(
        &self,
        id: &str,
        exceptions: &BTreeSet<CalendarDay>,
    ) -> impl Future<Output = PoolDayResult<()>> + Send;

    fn delete_series(&self, id: &str) -> impl Future<Output = PoolDayResult<()>> + Send;
}

/// Where completed service records are committed.
pub trait ServiceRecordStore: Send + Sync {
    /// Insert-or-replace keyed by `client_id`. Repeating a call with the same
    /// id must leave the store as the first successful call did.
    fn upsert_service_record(
        &self,
        client_id: &str,
        payload: &ServiceRecordPayload,
    ) -> impl Future<Output = PoolDayResult<UpsertReceipt>> + Send;
}

/// The remote store reached through a provider binary.
#[derive(Debug, Clone)]
pub struct Remote {
    pub provider: Provider,
}

impl Remote {
    pub fn new(provider: Provider) -> Self {
        Remote { provider }
    }
}

impl AppointmentStore for Remote {
    async fn list_appointments(&self, range: DayRange) -> PoolDayResult<Vec<Appointment>> {
        let mut appointments = self
            .provider
            .call(ListAppointments {
                from: range.start,
                to: range.end,
            })
            .await?;
        appointments.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        Ok(appointments)
    }

    async fn create_appointment(&self, appointment: &Appointment) -> PoolDayResult<Appointment> {
        self.provider
            .call(CreateAppointment {
                appointment: appointment.clone(),
            })
            .await
    }

    async fn update_appointment(
        &self,
        id: &str,
        appointment: &Appointment,
    ) -> PoolDayResult<Appointment> {
        self.provider
            .call(UpdateAppointment {
                id: id.to_string(),
                appointment: appointment.clone(),
            })
            .await
    }

    async fn delete_appointment(&self, id: &str) -> PoolDayResult<()> {
        self.provider
            .call(DeleteAppointment { id: id.to_string() })
            .await
    }

    async fn create_series(&self, series: &RecurrenceSeries) -> PoolDayResult<()> {
        self.provider
            .call(CreateSeries {
                series: series.clone(),
            })
            .await
    }

    async fn update_series_end_date(
        &self,
        id: &str,
        end: Option<CalendarDay>,
    ) -> PoolDayResult<()> {
        self.provider
            .call(UpdateSeriesEndDate {
                id: id.to_string(),
                end,
            })
            .await
    }

    async fn update_series_exceptions(
        &self,
        id: &str,
        exceptions: &BTreeSet<CalendarDay>,
    ) -> PoolDayResult<()> {
        self.provider
            .call(UpdateSeriesExceptions {
                id: id.to_string(),
                exceptions: exceptions.clone(),
            })
            .await
    }

    async fn delete_series(&self, id: &str) -> PoolDayResult<()> {
        self.provider
            .call(DeleteSeries { id: id.to_string() })
            .await
    }
}

impl ServiceRecordStore for Remote {
    async fn upsert_service_record(
        &self,
        client_id: &str,
        payload: &ServiceRecordPayload,
    ) -> PoolDayResult<UpsertReceipt> {
        self.provider
            .call(UpsertServiceRecord {
                client_id: client_id.to_string(),
                payload: payload.clone(),
            })
            .await
    }
}

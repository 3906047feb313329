//! In-memory remote stores for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use poolday_core::appointment::Appointment;
use poolday_core::date_range::DayRange;
use poolday_core::error::{PoolDayError, PoolDayResult};
use poolday_core::queue::ServiceRecordPayload;
use poolday_core::recurrence::RecurrenceSeries;
use poolday_core::remote::{AppointmentStore, ServiceRecordStore, UpsertReceipt};
use poolday_core::sync::{NotificationSink, SyncReport};
use poolday_core::time_window::CalendarDay;
use tokio::sync::{Notify, Semaphore, mpsc};

pub fn make_test_payload(customer: &str) -> ServiceRecordPayload {
    ServiceRecordPayload {
        appointment_id: None,
        customer_id: customer.to_string(),
        technician_id: Some("tech-1".to_string()),
        performed_at: Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap(),
        services: vec!["skim".to_string(), "filter-clean".to_string()],
        readings: BTreeMap::from([("ph".to_string(), 7.5)]),
        notes: None,
        attachments: vec![],
    }
}

/// Service-record store keyed by client id, with scripted failures per
/// customer id.
#[derive(Default)]
pub struct MemoryServiceStore {
    records: Mutex<BTreeMap<String, ServiceRecordPayload>>,
    calls: Mutex<Vec<String>>,
    unavailable_for: Mutex<HashSet<String>>,
    rejected_for: Mutex<HashSet<String>>,
    slow_for: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
}

impl MemoryServiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert waits for a permit on `gate` before committing.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        MemoryServiceStore {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn fail_unavailable(&self, customer: &str) {
        self.unavailable_for.lock().unwrap().insert(customer.to_string());
    }

    pub fn fail_rejected(&self, customer: &str) {
        self.rejected_for.lock().unwrap().insert(customer.to_string());
    }

    pub fn respond_slowly(&self, customer: &str) {
        self.slow_for.lock().unwrap().insert(customer.to_string());
    }

    pub fn recover(&self) {
        self.unavailable_for.lock().unwrap().clear();
        self.rejected_for.lock().unwrap().clear();
        self.slow_for.lock().unwrap().clear();
    }

    /// Resolves once an upsert has started.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn committed_customers(&self) -> Vec<String> {
        let mut customers: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .values()
            .map(|p| p.customer_id.clone())
            .collect();
        customers.sort();
        customers
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ServiceRecordStore for MemoryServiceStore {
    async fn upsert_service_record(
        &self,
        client_id: &str,
        payload: &ServiceRecordPayload,
    ) -> PoolDayResult<UpsertReceipt> {
        self.calls.lock().unwrap().push(client_id.to_string());
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| PoolDayError::RemoteUnavailable(e.to_string()))?;
            permit.forget();
        }

        let customer = payload.customer_id.as_str();
        let slow = self.slow_for.lock().unwrap().contains(customer);
        if slow {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.unavailable_for.lock().unwrap().contains(customer) {
            return Err(PoolDayError::RemoteUnavailable("connection reset".into()));
        }
        if self.rejected_for.lock().unwrap().contains(customer) {
            return Err(PoolDayError::RemoteRejected("unknown customer".into()));
        }

        self.records
            .lock()
            .unwrap()
            .insert(client_id.to_string(), payload.clone());
        Ok(UpsertReceipt { committed: true })
    }
}

/// Appointment store recording each call in order.
#[derive(Default)]
pub struct MemoryAppointmentStore {
    pub appointments: Mutex<BTreeMap<String, Appointment>>,
    pub series: Mutex<BTreeMap<String, RecurrenceSeries>>,
    pub log: Mutex<Vec<String>>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl AppointmentStore for MemoryAppointmentStore {
    async fn list_appointments(&self, range: DayRange) -> PoolDayResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .values()
            .filter(|a| range.contains(a.date))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        Ok(appointments)
    }

    async fn create_appointment(&self, appointment: &Appointment) -> PoolDayResult<Appointment> {
        self.record(format!("create_appointment {}", appointment.date));
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id.clone(), appointment.clone());
        Ok(appointment.clone())
    }

    async fn update_appointment(
        &self,
        id: &str,
        appointment: &Appointment,
    ) -> PoolDayResult<Appointment> {
        self.record(format!("update_appointment {}", appointment.date));
        let mut appointments = self.appointments.lock().unwrap();
        if !appointments.contains_key(id) {
            return Err(PoolDayError::NotFound(format!("appointment {}", id)));
        }
        appointments.insert(id.to_string(), appointment.clone());
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: &str) -> PoolDayResult<()> {
        let removed = self.appointments.lock().unwrap().remove(id);
        if let Some(appointment) = removed {
            self.record(format!("delete_appointment {}", appointment.date));
        }
        Ok(())
    }

    async fn create_series(&self, series: &RecurrenceSeries) -> PoolDayResult<()> {
        self.record(format!("create_series {}", series.start));
        self.series
            .lock()
            .unwrap()
            .insert(series.id.clone(), series.clone());
        Ok(())
    }

    async fn update_series_end_date(
        &self,
        id: &str,
        end: Option<CalendarDay>,
    ) -> PoolDayResult<()> {
        let end_label = end.map(|d| d.to_string()).unwrap_or_else(|| "open".into());
        self.record(format!("update_series_end_date {}", end_label));
        let mut series = self.series.lock().unwrap();
        let found = series
            .get_mut(id)
            .ok_or_else(|| PoolDayError::NotFound(format!("series {}", id)))?;
        found.end = end;
        Ok(())
    }

    async fn update_series_exceptions(
        &self,
        id: &str,
        exceptions: &BTreeSet<CalendarDay>,
    ) -> PoolDayResult<()> {
        self.record(format!("update_series_exceptions {}", exceptions.len()));
        let mut series = self.series.lock().unwrap();
        let found = series
            .get_mut(id)
            .ok_or_else(|| PoolDayError::NotFound(format!("series {}", id)))?;
        found.exceptions = exceptions.clone();
        Ok(())
    }

    async fn delete_series(&self, id: &str) -> PoolDayResult<()> {
        self.record("delete_series".to_string());
        self.series.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Forwards every report to a channel.
pub struct ChannelSink(pub mpsc::UnboundedSender<SyncReport>);

impl NotificationSink for ChannelSink {
    fn sync_finished(&self, report: &SyncReport) {
        let _ = self.0.send(report.clone());
    }
}

//! Scoped edits and deletes on recurring appointments.
//!
//! A request targets one materialized occurrence and a scope:
//! - `Single`: only the target. It leaves the series (update) or is removed
//!   (delete), and its day becomes an exception of the series.
//! - `Future`: the series is split at the target day. The original keeps the
//!   occurrences before it and ends the day before; everything from the
//!   target on moves to a new series, which then takes the action.
//! - `All`: every appointment the series owns; delete also drops the series.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::appointment::AppointmentFields;
use crate::error::{PoolDayError, PoolDayResult};
use crate::recurrence::{Frequency, RecurrenceSeries, is_occurrence, months_between, occurrence_position};
use crate::series::{Schedule, ScheduleDiff, new_id};
use crate::time_window::CalendarDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationScope {
    Single,
    Future,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MutationAction {
    Update { fields: AppointmentFields },
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub appointment_id: String,
    pub occurrence_day: CalendarDay,
    pub scope: MutationScope,
    #[serde(flatten)]
    pub action: MutationAction,
}

impl MutationRequest {
    pub fn update(
        appointment_id: impl Into<String>,
        occurrence_day: CalendarDay,
        scope: MutationScope,
        fields: AppointmentFields,
    ) -> Self {
        MutationRequest {
            appointment_id: appointment_id.into(),
            occurrence_day,
            scope,
            action: MutationAction::Update { fields },
        }
    }

    pub fn delete(
        appointment_id: impl Into<String>,
        occurrence_day: CalendarDay,
        scope: MutationScope,
    ) -> Self {
        MutationRequest {
            appointment_id: appointment_id.into(),
            occurrence_day,
            scope,
            action: MutationAction::Delete,
        }
    }
}

impl Schedule {
    /// Apply a scoped mutation. On error the schedule is left untouched.
    pub fn mutate(&mut self, request: &MutationRequest) -> PoolDayResult<ScheduleDiff> {
        let mut working = self.clone();
        working.apply_mutation(request)?;

        let diff = ScheduleDiff::between(self, &working);
        *self = working;
        Ok(diff)
    }

    fn apply_mutation(&mut self, request: &MutationRequest) -> PoolDayResult<()> {
        let appointment = self
            .appointments
            .get(&request.appointment_id)
            .ok_or_else(|| {
                PoolDayError::NotFound(format!("appointment {}", request.appointment_id))
            })?;

        let Some(series_id) = appointment.series_id.clone() else {
            return match request.scope {
                MutationScope::Single => self.mutate_standalone(request),
                scope => Err(PoolDayError::InvalidScope(format!(
                    "{:?} scope needs a recurring appointment, {} is standalone",
                    scope, request.appointment_id
                ))),
            };
        };

        if appointment.date != request.occurrence_day {
            return Err(PoolDayError::NotFound(format!(
                "appointment {} is not on {}",
                request.appointment_id, request.occurrence_day
            )));
        }

        let series = self
            .series
            .get(&series_id)
            .ok_or_else(|| PoolDayError::NotFound(format!("series {}", series_id)))?;
        let series_start = series.start;

        if !is_occurrence(series, request.occurrence_day) {
            return Err(PoolDayError::NotFound(format!(
                "{} is not an occurrence of series {}",
                request.occurrence_day, series_id
            )));
        }

        if let MutationAction::Update { fields } = &request.action {
            if fields.moves_date() && request.scope != MutationScope::Single {
                return Err(PoolDayError::InvalidScope(
                    "only a single occurrence can be moved to another day".to_string(),
                ));
            }
        }

        debug!(
            series_id = %series_id,
            day = %request.occurrence_day,
            scope = ?request.scope,
            "mutating series"
        );

        match request.scope {
            MutationScope::Single => {
                self.mutate_single(&series_id, request);
                Ok(())
            }
            // Splitting at the first day would leave nothing behind
            MutationScope::Future if request.occurrence_day == series_start => {
                self.mutate_all(&series_id, &request.action);
                Ok(())
            }
            MutationScope::Future => {
                let tail_id = self.split_series(&series_id, request.occurrence_day);
                self.mutate_all(&tail_id, &request.action);
                Ok(())
            }
            MutationScope::All => {
                self.mutate_all(&series_id, &request.action);
                Ok(())
            }
        }
    }

    fn mutate_standalone(&mut self, request: &MutationRequest) -> PoolDayResult<()> {
        let date = self
            .appointments
            .get(&request.appointment_id)
            .map(|a| a.date);
        if date != Some(request.occurrence_day) {
            return Err(PoolDayError::NotFound(format!(
                "appointment {} is not on {}",
                request.appointment_id, request.occurrence_day
            )));
        }

        match &request.action {
            MutationAction::Update { fields } => {
                if let Some(appointment) = self.appointments.get_mut(&request.appointment_id) {
                    fields.apply_to(appointment);
                }
            }
            MutationAction::Delete => {
                self.appointments.remove(&request.appointment_id);
            }
        }
        Ok(())
    }

    fn mutate_single(&mut self, series_id: &str, request: &MutationRequest) {
        if let Some(series) = self.series.get_mut(series_id) {
            series.appointment_ids.remove(&request.appointment_id);
            series.exceptions.insert(request.occurrence_day);
        }

        match &request.action {
            MutationAction::Update { fields } => {
                if let Some(appointment) = self.appointments.get_mut(&request.appointment_id) {
                    appointment.detach();
                    fields.apply_to(appointment);
                }
            }
            MutationAction::Delete => {
                self.appointments.remove(&request.appointment_id);
            }
        }
    }

    fn mutate_all(&mut self, series_id: &str, action: &MutationAction) {
        let owned: Vec<String> = self
            .series
            .get(series_id)
            .map(|s| s.appointment_ids.iter().cloned().collect())
            .unwrap_or_default();

        match action {
            MutationAction::Update { fields } => {
                for id in &owned {
                    if let Some(appointment) = self.appointments.get_mut(id) {
                        fields.apply_to(appointment);
                    }
                }
            }
            MutationAction::Delete => {
                for id in &owned {
                    self.appointments.remove(id);
                }
                self.series.remove(series_id);
            }
        }
    }

    /// Split `series_id` at `day` and return the id of the new tail series.
    fn split_series(&mut self, series_id: &str, day: CalendarDay) -> String {
        let Some(original) = self.series.get_mut(series_id) else {
            return series_id.to_string();
        };

        let mut tail = RecurrenceSeries::new(new_id(), original.frequency, day, original.end);
        tail.exceptions = original.exceptions.split_off(&day);
        original.end = Some(day.pred());

        let head_end = original.end;
        let owned: Vec<String> = original.appointment_ids.iter().cloned().collect();

        for id in owned {
            let Some(appointment) = self.appointments.get_mut(&id) else {
                continue;
            };

            if appointment.date < day {
                appointment.recurrence_end_date = head_end;
                continue;
            }

            // A monthly series split on a clamped day (the 29th of a series
            // anchored on the 31st) is re-anchored; keep each later visit in
            // its month but on the new anchor's day.
            if tail.frequency == Frequency::Monthly && !is_occurrence(&tail, appointment.date) {
                let months = months_between(tail.start, appointment.date);
                if let Some(realigned) = tail.frequency.nth(tail.start, months) {
                    appointment.date = realigned;
                }
            }

            appointment.series_id = Some(tail.id.clone());
            appointment.series_position = occurrence_position(&tail, appointment.date);
            appointment.recurrence_end_date = tail.end;
            tail.appointment_ids.insert(id.clone());

            if let Some(original) = self.series.get_mut(series_id) {
                original.appointment_ids.remove(&id);
            }
        }

        debug!(series_id, tail_id = %tail.id, %day, "split series");

        let tail_id = tail.id.clone();
        self.series.insert(tail_id.clone(), tail);
        tail_id
    }
}

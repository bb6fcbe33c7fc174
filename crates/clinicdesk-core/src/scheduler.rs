//! Week/day schedule grid.
//!
//! Places appointments into `(date, slot)` cells. A cell matches when the
//! appointment's date equals the column date and its start time, truncated to
//! `HH:MM`, equals the slot label. Several appointments may share a cell.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::config::{ClinicConfig, ConfigResult};
use crate::models::Appointment;

/// The 7 dates of the Sunday-started week containing `date`.
pub fn week_of(date: NaiveDate) -> [NaiveDate; 7] {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    let sunday = date - Days::new(offset);
    std::array::from_fn(|i| sunday + Days::new(i as u64))
}

/// Slot labels from `start` to `end` inclusive, every `step_minutes`.
pub fn time_slots(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Vec<String> {
    let step = Duration::minutes(i64::from(step_minutes.max(1)));
    let mut slots = Vec::new();
    let mut current = start;
    while current <= end {
        slots.push(current.format("%H:%M").to_string());
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }
    slots
}

/// One row of the rendered grid: a slot label and its cell per column.
#[derive(Debug, Clone, Serialize)]
pub struct GridRow<'a> {
    pub slot: String,
    pub cells: Vec<Vec<&'a Appointment>>,
}

/// Schedule view over a borrowed, date/time-sorted appointment list.
#[derive(Debug, Clone)]
pub struct WeekGrid<'a> {
    appointments: &'a [Appointment],
    reference: NaiveDate,
    slots: Vec<String>,
}

impl<'a> WeekGrid<'a> {
    pub fn new(appointments: &'a [Appointment], reference: NaiveDate, slots: Vec<String>) -> Self {
        Self {
            appointments,
            reference,
            slots,
        }
    }

    /// Grid using the configured slot range.
    pub fn from_config(
        appointments: &'a [Appointment],
        reference: NaiveDate,
        config: &ClinicConfig,
    ) -> ConfigResult<Self> {
        let slots = time_slots(config.slot_start_time()?, config.slot_end_time()?, config.slot_minutes);
        Ok(Self::new(appointments, reference, slots))
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Columns of the week view.
    pub fn dates(&self) -> [NaiveDate; 7] {
        week_of(self.reference)
    }

    /// First and last date of the visible week.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        let dates = self.dates();
        (dates[0], dates[6])
    }

    /// The same grid shifted by whole weeks (negative moves back).
    pub fn navigate(&self, weeks: i64) -> Self {
        let reference = weeks
            .checked_mul(7)
            .and_then(Duration::try_days)
            .and_then(|days| self.reference.checked_add_signed(days))
            .unwrap_or(self.reference);
        Self {
            appointments: self.appointments,
            reference,
            slots: self.slots.clone(),
        }
    }

    /// Appointments in the `(date, slot)` cell, in input order.
    pub fn cell_for(&self, date: NaiveDate, slot: &str) -> Vec<&'a Appointment> {
        self.appointments
            .iter()
            .filter(|apt| apt.scheduled_date == date && apt.start_label() == slot)
            .collect()
    }

    /// Full week grid, one row per slot, seven cells per row.
    pub fn rows(&self) -> Vec<GridRow<'a>> {
        let dates = self.dates();
        self.slots
            .iter()
            .map(|slot| GridRow {
                slot: slot.clone(),
                cells: dates.iter().map(|d| self.cell_for(*d, slot)).collect(),
            })
            .collect()
    }

    /// Single-column grid for `date`.
    pub fn day_view(&self, date: NaiveDate) -> Vec<GridRow<'a>> {
        self.slots
            .iter()
            .map(|slot| GridRow {
                slot: slot.clone(),
                cells: vec![self.cell_for(date, slot)],
            })
            .collect()
    }

    /// Appointments in the visible week that fall in no slot (off-grid start
    /// times such as 09:15 or outside clinic hours).
    pub fn unslotted(&self) -> Vec<&'a Appointment> {
        let (first, last) = self.range();
        self.appointments
            .iter()
            .filter(|apt| apt.scheduled_date >= first && apt.scheduled_date <= last)
            .filter(|apt| !self.slots.contains(&apt.start_label()))
            .collect()
    }
}

//! Center registry.
//!
//! Stores vaccination centers, indexes them by district and guards each
//! center's per-day counters with its own mutex. [`CenterRegistry::admit`] is
//! the one critical section that stops a center-day from being oversold.

use crate::config::{BookingConfig, CapacityPolicy};
use crate::error::{BookingError, Entity, Result};
use crate::metrics;
use crate::sync::{lock, read, write};
use crate::types::{Capacity, Center, CenterId, CenterSnapshot, Day, DistrictId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Default)]
struct CenterTable {
    entries: HashMap<CenterId, Arc<Mutex<Center>>>,
    /// Center ids per district, in registration order
    by_district: HashMap<DistrictId, Vec<CenterId>>,
}

/// Registry of vaccination centers.
#[derive(Debug)]
pub struct CenterRegistry {
    table: RwLock<CenterTable>,
    capacity_policy: CapacityPolicy,
    max_default_capacity: u32,
}

impl Default for CenterRegistry {
    fn default() -> Self {
        Self::new(&BookingConfig::default())
    }
}

impl CenterRegistry {
    /// Create an empty registry governed by `config`.
    #[must_use]
    pub fn new(config: &BookingConfig) -> Self {
        Self {
            table: RwLock::new(CenterTable::default()),
            capacity_policy: config.capacity_policy,
            max_default_capacity: config.max_default_capacity,
        }
    }

    /// Register a new center.
    ///
    /// Any capacity overrides already set on `center` are kept. Booking
    /// counts are not: a center starts with no bookings, so counts carried
    /// by a copy taken from another registry are dropped.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidRecord`] if the id or district is blank, or the
    ///   default capacity exceeds the configured maximum
    /// - [`BookingError::DuplicateId`] if the id is already registered
    pub fn register(&self, mut center: Center) -> Result<()> {
        self.validate(&center)?;
        if !center.booking_count_by_day.is_empty() {
            tracing::warn!(center_id = %center.id, "Dropping booking counts from registered center");
            center.booking_count_by_day.clear();
        }

        let mut table = write(&self.table);
        if table.entries.contains_key(&center.id) {
            tracing::warn!(center_id = %center.id, "Rejected duplicate center registration");
            return Err(BookingError::duplicate(Entity::Center, &center.id));
        }

        tracing::info!(
            center_id = %center.id,
            district = %center.district,
            default_capacity = %center.default_capacity,
            "Registered center"
        );

        table
            .by_district
            .entry(center.district.clone())
            .or_default()
            .push(center.id.clone());
        table
            .entries
            .insert(center.id.clone(), Arc::new(Mutex::new(center)));
        metrics::record_registration("center");
        Ok(())
    }

    /// Look up a center.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown id.
    pub fn get(&self, center_id: &CenterId) -> Result<Center> {
        let entry = self.entry(center_id)?;
        let center = lock(&entry).clone();
        Ok(center)
    }

    /// Day and capacity details for a center.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown id.
    pub fn snapshot(&self, center_id: &CenterId) -> Result<CenterSnapshot> {
        let entry = self.entry(center_id)?;
        let snapshot = lock(&entry).snapshot();
        Ok(snapshot)
    }

    /// Centers in a district, in registration order.
    ///
    /// An unknown district yields an empty list.
    #[must_use]
    pub fn list_by_district(&self, district: &DistrictId) -> Vec<CenterSnapshot> {
        let table = read(&self.table);
        table
            .by_district
            .get(district)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| table.entries.get(id))
                    .map(|entry| lock(entry).snapshot())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of registered centers.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.table).entries.len()
    }

    /// Whether no center is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set (or replace) the capacity override for one day.
    ///
    /// If `capacity` is below the bookings already admitted for `day`, the
    /// configured [`CapacityPolicy`] decides: `Reject` refuses the change,
    /// `AllowOversell` stores it and admits nothing new until cancellations
    /// bring the count back under the cap.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown center
    /// - [`BookingError::CapacityBelowActive`] under [`CapacityPolicy::Reject`]
    pub fn set_day_capacity(
        &self,
        center_id: &CenterId,
        day: Day,
        capacity: Capacity,
    ) -> Result<()> {
        let entry = self.entry(center_id)?;
        let mut center = lock(&entry);
        let active = center.booked(day);

        if capacity.value() < active {
            match self.capacity_policy {
                CapacityPolicy::Reject => {
                    tracing::warn!(
                        center_id = %center_id,
                        day = %day,
                        requested = %capacity,
                        active,
                        "Rejected capacity below active bookings"
                    );
                    return Err(BookingError::CapacityBelowActive {
                        center_id: center_id.clone(),
                        day,
                        requested: capacity.value(),
                        active,
                    });
                }
                CapacityPolicy::AllowOversell => {
                    tracing::warn!(
                        center_id = %center_id,
                        day = %day,
                        requested = %capacity,
                        active,
                        "Capacity set below active bookings, center-day is oversold"
                    );
                }
            }
        }

        center.capacity_by_day.insert(day, capacity);
        tracing::info!(center_id = %center_id, day = %day, capacity = %capacity, "Set day capacity");
        Ok(())
    }

    /// Slots left for a center-day.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown center.
    pub fn available(&self, center_id: &CenterId, day: Day) -> Result<u32> {
        let entry = self.entry(center_id)?;
        let remaining = lock(&entry).remaining(day);
        Ok(remaining)
    }

    /// Atomically check capacity and take one slot. Returns the new count.
    pub(crate) fn admit(&self, center_id: &CenterId, day: Day) -> Result<u32> {
        let entry = self.entry(center_id)?;
        let mut center = lock(&entry);

        if !center.has_availability(day) {
            return Err(BookingError::CapacityExceeded {
                center_id: center_id.clone(),
                day,
                capacity: center.effective_capacity(day).value(),
            });
        }

        let count = center.booking_count_by_day.entry(day).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    /// Return one slot for a center-day. Returns the new count.
    pub(crate) fn release(&self, center_id: &CenterId, day: Day) -> Result<u32> {
        let entry = self.entry(center_id)?;
        let mut center = lock(&entry);

        match center.booked(day) {
            0 => Err(BookingError::InconsistentState(format!(
                "release on center {center_id} day {day} with no bookings"
            ))),
            1 => {
                center.booking_count_by_day.remove(&day);
                Ok(0)
            }
            n => {
                center.booking_count_by_day.insert(day, n - 1);
                Ok(n - 1)
            }
        }
    }

    fn validate(&self, center: &Center) -> Result<()> {
        if center.id.as_str().trim().is_empty() {
            return Err(BookingError::InvalidRecord(
                "center id cannot be empty".to_string(),
            ));
        }
        if center.district.as_str().trim().is_empty() {
            return Err(BookingError::InvalidRecord(format!(
                "center {} has an empty district",
                center.id
            )));
        }
        if center.default_capacity.value() > self.max_default_capacity {
            return Err(BookingError::InvalidRecord(format!(
                "center {} default capacity {} exceeds maximum {}",
                center.id, center.default_capacity, self.max_default_capacity
            )));
        }
        Ok(())
    }

    fn entry(&self, center_id: &CenterId) -> Result<Arc<Mutex<Center>>> {
        read(&self.table)
            .entries
            .get(center_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found(Entity::Center, center_id))
    }
}

//! Booking coordinator: admission and cancellation rules.
//!
//! The coordinator owns the booking ledger and drives the two registries
//! through their narrow transitions:
//!
//! ```text
//! book(user, center, day)
//!   users.get        -> NotFound
//!   age check        -> Ineligible
//!   users.claim      -> AlreadyBooked        (per-user check-and-set)
//!   centers.admit    -> NotFound / CapacityExceeded, claim abandoned
//!   ledger.insert
//!   users.commit
//!
//! cancel(user)
//!   users.release    -> NotFound / NoActiveBooking   (Held -> Pending)
//!   ledger.cancel    -> InconsistentState if the index disagrees
//!   centers.release  (slot returned to the center-day)
//!   users.abandon    (Pending -> Free, user may book again)
//! ```
//!
//! Lock order is user, then center or ledger. A center lock and the ledger
//! lock are never held together.

use crate::config::BookingConfig;
use crate::environment::{Clock, SystemClock};
use crate::error::{BookingError, Entity, Result};
use crate::metrics;
use crate::sync::{read, write};
use crate::types::{
    Booking, BookingId, BookingStatus, CenterId, CenterSnapshot, Day, UserId,
};
use crate::{centers::CenterRegistry, users::UserRegistry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Every booking ever made, with the two indexes the coordinator needs.
#[derive(Debug, Default)]
struct BookingLedger {
    /// Creation order; bookings are never removed
    bookings: Vec<Booking>,
    index: HashMap<BookingId, usize>,
    active_by_user: HashMap<UserId, BookingId>,
}

impl BookingLedger {
    /// Append an active booking. Returns the number of active bookings.
    fn insert(&mut self, booking: Booking) -> Result<usize> {
        if let Some(existing) = self.active_by_user.get(&booking.user_id) {
            return Err(BookingError::InconsistentState(format!(
                "user {} already indexed with active booking {existing}",
                booking.user_id
            )));
        }

        let position = self.bookings.len();
        self.index.insert(booking.id, position);
        self.active_by_user.insert(booking.user_id.clone(), booking.id);
        self.bookings.push(booking);
        Ok(self.active_by_user.len())
    }

    fn get(&self, booking_id: &BookingId) -> Option<&Booking> {
        self.index
            .get(booking_id)
            .and_then(|position| self.bookings.get(*position))
    }

    /// Mark the user's active booking cancelled and drop it from the active index.
    fn cancel(&mut self, user_id: &UserId, cancelled_at: DateTime<Utc>) -> Result<Booking> {
        let booking_id = self.active_by_user.remove(user_id).ok_or_else(|| {
            BookingError::InconsistentState(format!(
                "user {user_id} holds a booking slot but has no indexed booking"
            ))
        })?;

        let booking = self
            .index
            .get(&booking_id)
            .copied()
            .and_then(|position| self.bookings.get_mut(position))
            .ok_or_else(|| {
                BookingError::InconsistentState(format!(
                    "booking {booking_id} is indexed for user {user_id} but missing"
                ))
            })?;

        booking.status = BookingStatus::Cancelled { cancelled_at };
        Ok(booking.clone())
    }

    fn active(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(|booking| booking.is_active())
    }
}

/// Creates, looks up and cancels bookings while keeping the user and center
/// registries consistent with the ledger.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct BookingCoordinator {
    users: Arc<UserRegistry>,
    centers: Arc<CenterRegistry>,
    ledger: RwLock<BookingLedger>,
    clock: Arc<dyn Clock>,
    minimum_age: u32,
}

impl std::fmt::Debug for BookingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingCoordinator")
            .field("users", &self.users.len())
            .field("centers", &self.centers.len())
            .field("active_bookings", &self.active_count())
            .field("minimum_age", &self.minimum_age)
            .finish_non_exhaustive()
    }
}

impl BookingCoordinator {
    /// Create a coordinator over existing registries.
    #[must_use]
    pub fn new(
        users: Arc<UserRegistry>,
        centers: Arc<CenterRegistry>,
        config: &BookingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            centers,
            ledger: RwLock::new(BookingLedger::default()),
            clock,
            minimum_age: config.minimum_age,
        }
    }

    /// Create a coordinator with empty registries and the system clock.
    #[must_use]
    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(
            Arc::new(UserRegistry::new()),
            Arc::new(CenterRegistry::new(config)),
            config,
            Arc::new(SystemClock),
        )
    }

    /// The user registry.
    #[must_use]
    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    /// The center registry.
    #[must_use]
    pub fn centers(&self) -> &CenterRegistry {
        &self.centers
    }

    /// Book `user_id` at `center_id` on `day`.
    ///
    /// Capacity is first-committed-wins: among concurrent requests for the
    /// last slot of a center-day exactly one is admitted.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`BookingError::NotFound`] for an unknown user
    /// - [`BookingError::Ineligible`] if the user is under the minimum age
    /// - [`BookingError::AlreadyBooked`] if the user holds an active booking
    /// - [`BookingError::NotFound`] for an unknown center
    /// - [`BookingError::CapacityExceeded`] if the center-day is full
    #[tracing::instrument(skip(self), name = "booking_book")]
    pub fn book(&self, user_id: &UserId, center_id: &CenterId, day: Day) -> Result<Booking> {
        match self.try_book(user_id, center_id, day) {
            Ok(booking) => {
                tracing::info!(
                    booking_id = %booking.id,
                    user_id = %user_id,
                    center_id = %center_id,
                    day = %day,
                    "Booking admitted"
                );
                Ok(booking)
            }
            Err(error) => {
                metrics::record_rejected(error.reason());
                if matches!(error, BookingError::InconsistentState(_)) {
                    tracing::error!(%error, "Booking failed on inconsistent state");
                } else {
                    tracing::warn!(%error, reason = error.reason(), "Booking rejected");
                }
                Err(error)
            }
        }
    }

    fn try_book(&self, user_id: &UserId, center_id: &CenterId, day: Day) -> Result<Booking> {
        let user = self.users.get(user_id)?;
        if !user.is_eligible(self.minimum_age) {
            return Err(BookingError::Ineligible {
                user_id: user_id.clone(),
                age: user.age,
                minimum_age: self.minimum_age,
            });
        }

        self.users.claim(user_id)?;

        if let Err(error) = self.centers.admit(center_id, day) {
            self.users.abandon(user_id);
            return Err(error);
        }

        let booking = Booking::new(
            BookingId::new(),
            user.id,
            user.name,
            center_id.clone(),
            day,
            self.clock.now(),
        );

        let inserted = {
            let mut ledger = write(&self.ledger);
            ledger.insert(booking.clone()).inspect(|active| metrics::set_active(*active))
        };
        if let Err(error) = inserted {
            self.roll_back_admission(center_id, day);
            self.users.abandon(user_id);
            return Err(error);
        }

        self.users.commit(user_id)?;
        metrics::record_admitted();
        Ok(booking)
    }

    fn roll_back_admission(&self, center_id: &CenterId, day: Day) {
        if let Err(error) = self.centers.release(center_id, day) {
            tracing::error!(%error, center_id = %center_id, day = %day, "Failed to roll back admission");
        }
    }

    /// Cancel the user's active booking and return the slot to its center-day.
    ///
    /// The cancelled record stays in the ledger; the user may book again.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown user
    /// - [`BookingError::NoActiveBooking`] if the user holds no booking
    /// - [`BookingError::InconsistentState`] if the ledger disagrees with the
    ///   user's slot; nothing is cancelled in that case
    #[tracing::instrument(skip(self), name = "booking_cancel")]
    pub fn cancel(&self, user_id: &UserId) -> Result<Booking> {
        self.users.release(user_id).inspect_err(|error| {
            tracing::warn!(%error, reason = error.reason(), "Cancel rejected");
        })?;

        let cancelled = {
            let mut ledger = write(&self.ledger);
            let cancelled = ledger.cancel(user_id, self.clock.now());
            if cancelled.is_ok() {
                metrics::set_active(ledger.active_by_user.len());
            }
            cancelled
        };

        let booking = match cancelled {
            Ok(cancelled) => cancelled,
            Err(error) => {
                tracing::error!(%error, user_id = %user_id, "Cancel failed on inconsistent state");
                // Ledger untouched, so the user keeps holding the slot
                self.users.commit(user_id)?;
                return Err(error);
            }
        };

        // The ledger already records the cancellation, so a missing counter
        // is logged and the cancel still succeeds.
        if let Err(error) = self.centers.release(&booking.center_id, booking.day) {
            tracing::error!(%error, booking_id = %booking.id, "Cancelled booking had no counted slot");
        }
        self.users.abandon(user_id);

        metrics::record_cancelled();
        tracing::info!(
            booking_id = %booking.id,
            user_id = %user_id,
            center_id = %booking.center_id,
            day = %booking.day,
            "Booking cancelled"
        );
        Ok(booking)
    }

    /// The user's active booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown user
    /// - [`BookingError::NoActiveBooking`] if the user holds no booking
    pub fn active_booking_for_user(&self, user_id: &UserId) -> Result<Booking> {
        self.users.get(user_id)?;

        let ledger = read(&self.ledger);
        let booking_id = ledger
            .active_by_user
            .get(user_id)
            .ok_or_else(|| BookingError::NoActiveBooking {
                user_id: user_id.clone(),
            })?;

        ledger.get(booking_id).cloned().ok_or_else(|| {
            BookingError::InconsistentState(format!(
                "booking {booking_id} is indexed for user {user_id} but missing"
            ))
        })
    }

    /// Look up any booking, active or cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown booking id.
    pub fn get_booking(&self, booking_id: &BookingId) -> Result<Booking> {
        read(&self.ledger)
            .get(booking_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found(Entity::Booking, booking_id))
    }

    /// Active bookings for one center-day, in creation order.
    ///
    /// Never fails; unknown centers or empty days give an empty list.
    #[must_use]
    pub fn list_for_center_day(&self, center_id: &CenterId, day: Day) -> Vec<Booking> {
        read(&self.ledger)
            .active()
            .filter(|booking| &booking.center_id == center_id && booking.day == day)
            .cloned()
            .collect()
    }

    /// Active bookings for a center across all days, ordered by day and then
    /// creation.
    #[must_use]
    pub fn list_for_center(&self, center_id: &CenterId) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = read(&self.ledger)
            .active()
            .filter(|booking| &booking.center_id == center_id)
            .cloned()
            .collect();
        // Stable sort keeps creation order within a day
        bookings.sort_by_key(|booking| booking.day);
        bookings
    }

    /// Centers in the user's own district.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown user.
    pub fn centers_near_user(&self, user_id: &UserId) -> Result<Vec<CenterSnapshot>> {
        let user = self.users.get(user_id)?;
        Ok(self.centers.list_by_district(&user.district))
    }

    /// Number of bookings currently holding a slot.
    #[must_use]
    pub fn active_count(&self) -> usize {
        read(&self.ledger).active_by_user.len()
    }

    /// Number of bookings ever made, cancelled ones included.
    #[must_use]
    pub fn total_count(&self) -> usize {
        read(&self.ledger).bookings.len()
    }
}

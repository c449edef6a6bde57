//! Error types for registry and booking operations.
//!
//! Every operation returns [`Result`]; nothing is retried internally. Whether to
//! retry a [`BookingError::CapacityExceeded`] on another day or center is the
//! caller's decision.

use crate::types::{CenterId, Day, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of record an identifier refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    /// A registered user
    User,
    /// A vaccination center
    Center,
    /// A booking created by the coordinator
    Booking,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Center => write!(f, "Center"),
            Self::Booking => write!(f, "Booking"),
        }
    }
}

/// Errors that can occur while registering records or booking slots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Unknown user, center or booking identifier.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was looked up
        entity: Entity,
        /// The identifier that did not resolve
        id: String,
    },

    /// A record with this identifier is already registered.
    ///
    /// The registry is left unchanged.
    #[error("{entity} already registered: {id}")]
    DuplicateId {
        /// What kind of record collided
        entity: Entity,
        /// The colliding identifier
        id: String,
    },

    /// The user is below the minimum booking age.
    #[error("User {user_id} is {age} years old, minimum age is {minimum_age}")]
    Ineligible {
        /// The rejected user
        user_id: UserId,
        /// The user's age
        age: u32,
        /// The configured minimum age
        minimum_age: u32,
    },

    /// The user already holds an active booking somewhere.
    #[error("User {user_id} already has an active booking")]
    AlreadyBooked {
        /// The user holding the booking
        user_id: UserId,
    },

    /// No slot left for the center on that day.
    #[error("No slot left at center {center_id} on day {day} (capacity {capacity})")]
    CapacityExceeded {
        /// The full center
        center_id: CenterId,
        /// The requested day
        day: Day,
        /// Effective capacity for that day
        capacity: u32,
    },

    /// Cancel was requested for a user with nothing to cancel.
    #[error("User {user_id} has no active booking")]
    NoActiveBooking {
        /// The user without a booking
        user_id: UserId,
    },

    /// A capacity override would fall below the bookings already admitted.
    ///
    /// Only returned under [`CapacityPolicy::Reject`](crate::config::CapacityPolicy::Reject).
    #[error(
        "Capacity {requested} for center {center_id} on day {day} is below {active} active bookings"
    )]
    CapacityBelowActive {
        /// The center being reconfigured
        center_id: CenterId,
        /// The day being reconfigured
        day: Day,
        /// The rejected capacity
        requested: u32,
        /// Active bookings already admitted for that day
        active: u32,
    },

    /// A record failed validation at registration time.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Internal indexes disagree with each other.
    ///
    /// Never expected in correct operation; indicates a bug.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
}

impl BookingError {
    /// Build a [`BookingError::NotFound`] for the given entity.
    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Build a [`BookingError::DuplicateId`] for the given entity.
    pub fn duplicate(entity: Entity, id: impl fmt::Display) -> Self {
        Self::DuplicateId {
            entity,
            id: id.to_string(),
        }
    }

    /// Short, stable label used for metrics and structured logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::DuplicateId { .. } => "duplicate_id",
            Self::Ineligible { .. } => "ineligible",
            Self::AlreadyBooked { .. } => "already_booked",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::NoActiveBooking { .. } => "no_active_booking",
            Self::CapacityBelowActive { .. } => "capacity_below_active",
            Self::InvalidRecord(_) => "invalid_record",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BookingError>;

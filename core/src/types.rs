//! Domain types for the vaccination booking registry.
//!
//! Identifiers, value objects and the three record kinds: [`User`], [`Center`]
//! and [`Booking`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct ParseIdError(String);

/// Declares an opaque string identifier.
///
/// `new()` and `From` do not validate; `FromStr` rejects the empty string and
/// is the entry point for external input.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "`.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError(concat!($label, " cannot be empty").to_string()));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier for a registered user (e.g. `"U1"`).
    UserId,
    "User ID"
);

string_id!(
    /// Unique identifier for a vaccination center (e.g. `"vc1"`).
    CenterId,
    "Center ID"
);

string_id!(
    /// Geographic grouping key shared by users and centers.
    DistrictId,
    "District ID"
);

/// Unique identifier for a booking, generated by the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Caller-defined day number (e.g. day of year). No calendar semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Day(u32);

impl Day {
    /// Creates a new `Day`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the day number
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Day {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of bookings a center accepts on a day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Capacity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Users
// ============================================================================

/// A person who can book a vaccination slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Age in years
    pub age: u32,
    /// District the user currently lives in
    pub district: DistrictId,
}

impl User {
    /// Creates a new `User`
    #[must_use]
    pub fn new(
        id: impl Into<UserId>,
        name: impl Into<String>,
        age: u32,
        district: impl Into<DistrictId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age,
            district: district.into(),
        }
    }

    /// Whether the user meets the minimum booking age.
    #[must_use]
    pub const fn is_eligible(&self, minimum_age: u32) -> bool {
        self.age >= minimum_age
    }
}

/// A user's hold on the single active booking they may own.
///
/// `Pending` covers the window while a booking is being recorded or a
/// cancellation is being applied. It blocks a second `book` and cannot be
/// cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookingSlot {
    /// No booking held
    #[default]
    Free,
    /// A booking is being admitted or cancelled
    Pending,
    /// An active booking is held
    Held,
}

impl BookingSlot {
    /// Whether the user holds or is acquiring a booking.
    #[must_use]
    pub const fn is_taken(self) -> bool {
        !matches!(self, Self::Free)
    }
}

// ============================================================================
// Centers
// ============================================================================

/// A vaccination center with per-day capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Center {
    /// Unique center identifier
    pub id: CenterId,
    /// Display name
    pub name: String,
    /// District the center belongs to
    pub district: DistrictId,
    /// State or region name, informational only
    pub state_name: Option<String>,
    /// Capacity for days without an override
    pub default_capacity: Capacity,
    /// Per-day capacity overrides
    #[serde(default)]
    pub(crate) capacity_by_day: BTreeMap<Day, Capacity>,
    /// Active bookings per day; absent means zero. Owned by the registry and
    /// never read from external input.
    #[serde(skip)]
    pub(crate) booking_count_by_day: BTreeMap<Day, u32>,
}

impl Center {
    /// Creates a new `Center` with no overrides and no bookings.
    #[must_use]
    pub fn new(
        id: impl Into<CenterId>,
        district: impl Into<DistrictId>,
        default_capacity: Capacity,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            district: district.into(),
            state_name: None,
            default_capacity,
            capacity_by_day: BTreeMap::new(),
            booking_count_by_day: BTreeMap::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the state or region name.
    #[must_use]
    pub fn with_state_name(mut self, state_name: impl Into<String>) -> Self {
        self.state_name = Some(state_name.into());
        self
    }

    /// Add a capacity override for a day before registration.
    #[must_use]
    pub fn with_day_capacity(mut self, day: Day, capacity: Capacity) -> Self {
        self.capacity_by_day.insert(day, capacity);
        self
    }

    /// Override for `day` if present, else the default capacity.
    #[must_use]
    pub fn effective_capacity(&self, day: Day) -> Capacity {
        self.capacity_by_day
            .get(&day)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    /// Active bookings admitted for `day`.
    #[must_use]
    pub fn booked(&self, day: Day) -> u32 {
        self.booking_count_by_day.get(&day).copied().unwrap_or(0)
    }

    /// Slots left for `day`. Zero when the center is oversold.
    #[must_use]
    pub fn remaining(&self, day: Day) -> u32 {
        self.effective_capacity(day)
            .value()
            .saturating_sub(self.booked(day))
    }

    /// Whether one more booking fits on `day`.
    #[must_use]
    pub fn has_availability(&self, day: Day) -> bool {
        self.booked(day) < self.effective_capacity(day).value()
    }

    /// Read model with day and capacity details.
    #[must_use]
    pub fn snapshot(&self) -> CenterSnapshot {
        let mut days: Vec<Day> = self
            .capacity_by_day
            .keys()
            .chain(self.booking_count_by_day.keys())
            .copied()
            .collect();
        days.sort_unstable();
        days.dedup();

        CenterSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            district: self.district.clone(),
            state_name: self.state_name.clone(),
            default_capacity: self.default_capacity,
            days: days
                .into_iter()
                .map(|day| DayCapacity {
                    day,
                    capacity: self.effective_capacity(day),
                    booked: self.booked(day),
                })
                .collect(),
        }
    }
}

/// Capacity and load for one center-day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCapacity {
    /// The day
    pub day: Day,
    /// Effective capacity on that day
    pub capacity: Capacity,
    /// Active bookings on that day
    pub booked: u32,
}

/// Point-in-time view of a center for listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterSnapshot {
    /// Center identifier
    pub id: CenterId,
    /// Display name
    pub name: String,
    /// District the center belongs to
    pub district: DistrictId,
    /// State or region name
    pub state_name: Option<String>,
    /// Capacity for days without an override
    pub default_capacity: Capacity,
    /// Every day with an override or a booking, ordered by day
    pub days: Vec<DayCapacity>,
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking lifecycle. Cancellation is the only transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Holds a slot
    Active,
    /// Slot returned to the center
    Cancelled {
        /// When the booking was cancelled
        cancelled_at: DateTime<Utc>,
    },
}

/// A user's appointment at a center on a day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// The booked user
    pub user_id: UserId,
    /// The user's name at booking time
    pub user_name: String,
    /// The booked center
    pub center_id: CenterId,
    /// The booked day
    pub day: Day,
    /// Current status
    pub status: BookingStatus,
    /// When the booking was admitted
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new active `Booking`
    #[must_use]
    pub const fn new(
        id: BookingId,
        user_id: UserId,
        user_name: String,
        center_id: CenterId,
        day: Day,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            user_name,
            center_id,
            day,
            status: BookingStatus::Active,
            created_at,
        }
    }

    /// Whether the booking still holds a slot.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Active)
    }
}

//! # Vaxbook Core
//!
//! In-memory registry for vaccination bookings.
//!
//! Users register, vaccination centers declare per-day capacity, and users book
//! or cancel a single appointment at a center-day. The crate enforces:
//!
//! - **One active booking per user**, system-wide
//! - **Per-day capacity** per center: an override for the day if set, otherwise
//!   the center's default
//! - **Eligibility**: users under the configured minimum age (18 by default)
//!   cannot book
//!
//! ## Components
//!
//! - [`UserRegistry`]: user records and each user's booking slot
//! - [`CenterRegistry`]: centers, capacity overrides and per-day counters
//! - [`BookingCoordinator`]: the rules, plus the ledger of every booking made
//!
//! ## Concurrency
//!
//! Everything is `Send + Sync` and takes `&self`. The capacity check-and-take for
//! a center-day runs under that center's lock and the one-booking check for a
//! user runs under that user's lock, so concurrent callers can neither oversell
//! a day nor double-book a user.
//!
//! ## Example
//!
//! ```
//! use vaxbook_core::{BookingConfig, BookingCoordinator, BookingError};
//! use vaxbook_core::types::{Capacity, Center, CenterId, Day, User, UserId};
//!
//! # fn main() -> Result<(), BookingError> {
//! let coordinator = BookingCoordinator::from_config(&BookingConfig::default());
//! coordinator.users().register(User::new("U1", "Harry", 35, "d1"))?;
//! coordinator.users().register(User::new("U2", "Ron", 30, "d1"))?;
//! coordinator
//!     .centers()
//!     .register(Center::new("vc1", "d1", Capacity::new(5)))?;
//! coordinator
//!     .centers()
//!     .set_day_capacity(&CenterId::new("vc1"), Day::new(1), Capacity::new(1))?;
//!
//! coordinator.book(&UserId::new("U1"), &CenterId::new("vc1"), Day::new(1))?;
//! let full = coordinator.book(&UserId::new("U2"), &CenterId::new("vc1"), Day::new(1));
//! assert!(matches!(full, Err(BookingError::CapacityExceeded { .. })));
//! # Ok(())
//! # }
//! ```

pub mod centers;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod types;
pub mod users;

mod sync;

/// Environment module - injected dependencies.
///
/// The coordinator stamps bookings with the time reported by a [`Clock`]
/// so tests can run against a fixed time.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use centers::CenterRegistry;
pub use config::{BookingConfig, CapacityPolicy};
pub use coordinator::BookingCoordinator;
pub use error::{BookingError, Entity, Result};
pub use users::UserRegistry;

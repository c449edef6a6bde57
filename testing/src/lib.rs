//! # Vaxbook Testing
//!
//! Testing utilities and helpers for the vaxbook booking registry.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic timestamps
//! - Builders for users, centers and a seeded coordinator
//! - proptest strategies for random booking workloads
//! - One-time tracing initialisation for test binaries
//!
//! ## Example
//!
//! ```
//! use vaxbook_testing::helpers::{seeded_coordinator, user_id, center_id};
//! use vaxbook_core::types::Day;
//!
//! let coordinator = seeded_coordinator();
//! assert!(coordinator.book(&user_id("U1"), &center_id("vc1"), Day::new(1)).is_ok());
//! ```

use chrono::{DateTime, Utc};
use vaxbook_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use vaxbook_testing::mocks::FixedClock;
    /// use vaxbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test scenarios.
pub mod helpers {
    use super::mocks::test_clock;
    use std::sync::Arc;
    use vaxbook_core::types::{Capacity, Center, CenterId, Day, User, UserId};
    use vaxbook_core::{BookingConfig, BookingCoordinator, CenterRegistry, UserRegistry};

    /// Shorthand for a [`UserId`].
    #[must_use]
    pub fn user_id(id: &str) -> UserId {
        UserId::new(id)
    }

    /// Shorthand for a [`CenterId`].
    #[must_use]
    pub fn center_id(id: &str) -> CenterId {
        CenterId::new(id)
    }

    /// An adult in district `d1`.
    #[must_use]
    pub fn adult(id: &str) -> User {
        User::new(id, format!("Adult {id}"), 30, "d1")
    }

    /// Empty coordinator on the fixed test clock.
    #[must_use]
    pub fn coordinator_with(config: &BookingConfig) -> BookingCoordinator {
        BookingCoordinator::new(
            Arc::new(UserRegistry::new()),
            Arc::new(CenterRegistry::new(config)),
            config,
            Arc::new(test_clock()),
        )
    }

    /// Coordinator seeded with the reference data set:
    ///
    /// - users `U1` Harry (35), `U2` Ron (30), `U3` Albus (30), `U4` Draco (15)
    ///   in `d1`, and `U5` Dobby (30) in `d2`
    /// - centers `vc1`, `vc2` in `d1` and `vc3` in `d3`, default capacity 5
    /// - overrides: `vc1` day 1 = 1, `vc2` day 1 = 3, `vc1` day 5 = 10,
    ///   `vc3` day 3 = 4
    ///
    /// # Panics
    ///
    /// Panics if the fixed data set fails to register, which would mean the
    /// registries reject valid input.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn seeded_coordinator() -> BookingCoordinator {
        let coordinator = coordinator_with(&BookingConfig::default());

        let users = [
            User::new("U1", "Harry", 35, "d1"),
            User::new("U2", "Ron", 30, "d1"),
            User::new("U3", "Albus", 30, "d1"),
            User::new("U4", "Draco", 15, "d1"),
            User::new("U5", "Dobby", 30, "d2"),
        ];
        for user in users {
            coordinator
                .users()
                .register(user)
                .expect("seed user should register");
        }

        for (id, district) in [("vc1", "d1"), ("vc2", "d1"), ("vc3", "d3")] {
            coordinator
                .centers()
                .register(Center::new(id, district, Capacity::new(5)))
                .expect("seed center should register");
        }

        for (id, day, capacity) in [("vc1", 1, 1), ("vc2", 1, 3), ("vc1", 5, 10), ("vc3", 3, 4)] {
            coordinator
                .centers()
                .set_day_capacity(&center_id(id), Day::new(day), Capacity::new(capacity))
                .expect("seed capacity should apply");
        }

        coordinator
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use vaxbook_core::types::{CenterId, Day, UserId};

    /// One step of a random booking workload.
    #[derive(Clone, Debug)]
    pub enum Operation {
        /// Book a user at a center-day
        Book {
            /// User index
            user: usize,
            /// Center index
            center: usize,
            /// Day number
            day: u32,
        },
        /// Cancel a user's booking
        Cancel {
            /// User index
            user: usize,
        },
        /// Override a center-day's capacity
        SetCapacity {
            /// Center index
            center: usize,
            /// Day number
            day: u32,
            /// New capacity
            capacity: u32,
        },
    }

    /// Identifier for the user at `index` in a generated workload.
    #[must_use]
    pub fn user_at(index: usize) -> UserId {
        UserId::new(format!("user-{index}"))
    }

    /// Identifier for the center at `index` in a generated workload.
    #[must_use]
    pub fn center_at(index: usize) -> CenterId {
        CenterId::new(format!("center-{index}"))
    }

    /// Days drawn from a small range so collisions are frequent.
    pub fn day_strategy(days: u32) -> impl Strategy<Value = Day> {
        (0..days).prop_map(Day::new)
    }

    /// Random operations over `users` users, `centers` centers and `days` days.
    pub fn operation_strategy(
        users: usize,
        centers: usize,
        days: u32,
    ) -> impl Strategy<Value = Operation> {
        prop_oneof![
            6 => (0..users, 0..centers, 0..days)
                .prop_map(|(user, center, day)| Operation::Book { user, center, day }),
            3 => (0..users).prop_map(|user| Operation::Cancel { user }),
            1 => (0..centers, 0..days, 0..4_u32)
                .prop_map(|(center, day, capacity)| Operation::SetCapacity { center, day, capacity }),
        ]
    }
}

/// Install a `tracing-subscriber` fmt subscriber for tests.
///
/// Respects `RUST_LOG` and defaults to `warn`. Safe to call from every test;
/// only the first call installs.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use helpers::{center_id, seeded_coordinator, user_id};
    use vaxbook_core::types::Day;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn seeded_data_is_registered() {
        let coordinator = seeded_coordinator();
        assert_eq!(coordinator.users().len(), 5);
        assert_eq!(coordinator.centers().len(), 3);
        assert_eq!(
            coordinator
                .centers()
                .available(&center_id("vc2"), Day::new(1))
                .unwrap(),
            3
        );
    }

    #[test]
    fn bookings_use_the_fixed_clock() {
        let coordinator = seeded_coordinator();
        let booking = coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .unwrap();
        assert_eq!(booking.created_at, test_clock().now());
    }
}

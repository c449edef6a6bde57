//! End-to-end booking scenarios against the seeded reference data.
//!
//! Seed: users U1 Harry (35), U2 Ron (30), U3 Albus (30), U4 Draco (15) in
//! `d1`, U5 Dobby (30) in `d2`; centers vc1, vc2 (`d1`) and vc3 (`d3`) with
//! default capacity 5 and overrides vc1/1 = 1, vc2/1 = 3, vc1/5 = 10,
//! vc3/3 = 4.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use vaxbook_core::environment::Clock;
use vaxbook_core::types::{BookingStatus, Capacity, Center, Day, DistrictId, User};
use vaxbook_core::{BookingConfig, BookingError, CapacityPolicy, Entity};
use vaxbook_testing::helpers::{center_id, coordinator_with, seeded_coordinator, user_id};
use vaxbook_testing::{init_test_tracing, test_clock};

mod booking_tests {
    use super::*;

    #[test]
    fn second_booking_on_a_single_slot_day_is_refused() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        let booking = coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .unwrap();
        assert_eq!(booking.user_name, "Harry");
        assert_eq!(booking.status, BookingStatus::Active);

        let result = coordinator.book(&user_id("U2"), &center_id("vc1"), Day::new(1));
        assert_eq!(
            result,
            Err(BookingError::CapacityExceeded {
                center_id: center_id("vc1"),
                day: Day::new(1),
                capacity: 1
            })
        );

        let listed = coordinator.list_for_center_day(&center_id("vc1"), Day::new(1));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, user_id("U1"));
    }

    #[test]
    fn minor_is_refused() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        let result = coordinator.book(&user_id("U4"), &center_id("vc2"), Day::new(1));
        assert!(matches!(result, Err(BookingError::Ineligible { age: 15, .. })));
        assert_eq!(coordinator.centers().available(&center_id("vc2"), Day::new(1)).unwrap(), 3);
        assert_eq!(coordinator.total_count(), 0);
    }

    #[test]
    fn user_cannot_hold_two_bookings() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        coordinator
            .book(&user_id("U2"), &center_id("vc2"), Day::new(1))
            .unwrap();
        let result = coordinator.book(&user_id("U2"), &center_id("vc1"), Day::new(5));
        assert_eq!(
            result,
            Err(BookingError::AlreadyBooked {
                user_id: user_id("U2")
            })
        );
        // Refused attempt leaves the target day untouched
        assert_eq!(coordinator.centers().available(&center_id("vc1"), Day::new(5)).unwrap(), 10);
    }

    #[test]
    fn second_center_same_day_is_already_booked() {
        let coordinator = seeded_coordinator();

        coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .unwrap();
        assert_eq!(
            coordinator.book(&user_id("U1"), &center_id("vc2"), Day::new(1)),
            Err(BookingError::AlreadyBooked {
                user_id: user_id("U1")
            })
        );
    }

    #[test]
    fn override_caps_the_day_below_default() {
        let coordinator = seeded_coordinator();

        for id in ["U1", "U2", "U3"] {
            coordinator
                .book(&user_id(id), &center_id("vc2"), Day::new(1))
                .unwrap();
        }
        assert!(matches!(
            coordinator.book(&user_id("U5"), &center_id("vc2"), Day::new(1)),
            Err(BookingError::CapacityExceeded { capacity: 3, .. })
        ));
    }

    #[test]
    fn default_capacity_applies_without_override() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        for id in ["U1", "U2", "U3", "U5"] {
            coordinator
                .book(&user_id(id), &center_id("vc2"), Day::new(7))
                .unwrap();
        }
        assert_eq!(coordinator.centers().available(&center_id("vc2"), Day::new(7)).unwrap(), 1);
        assert_eq!(coordinator.list_for_center_day(&center_id("vc2"), Day::new(7)).len(), 4);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        assert_eq!(
            coordinator.book(&user_id("U99"), &center_id("vc1"), Day::new(1)),
            Err(BookingError::not_found(Entity::User, "U99"))
        );
        assert_eq!(
            coordinator.book(&user_id("U1"), &center_id("vc99"), Day::new(1)),
            Err(BookingError::not_found(Entity::Center, "vc99"))
        );
        // The failed attempt did not consume U1's single booking
        assert!(coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .is_ok());
    }
}

mod cancel_tests {
    use super::*;

    #[test]
    fn cancel_clears_the_day_and_same_booking_can_be_remade() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .unwrap();
        coordinator.cancel(&user_id("U1")).unwrap();
        assert!(coordinator
            .list_for_center_day(&center_id("vc1"), Day::new(1))
            .is_empty());
        assert!(coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .is_ok());
    }

    #[test]
    fn cancel_then_rebook() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        let first = coordinator
            .book(&user_id("U1"), &center_id("vc1"), Day::new(1))
            .unwrap();
        let cancelled = coordinator.cancel(&user_id("U1")).unwrap();
        assert_eq!(cancelled.id, first.id);
        assert_eq!(
            cancelled.status,
            BookingStatus::Cancelled {
                cancelled_at: test_clock().now()
            }
        );

        // Freed slot is bookable by someone else
        let ron = coordinator
            .book(&user_id("U2"), &center_id("vc1"), Day::new(1))
            .unwrap();
        assert_eq!(
            coordinator.list_for_center_day(&center_id("vc1"), Day::new(1)),
            vec![ron]
        );

        // And the cancelling user may book again elsewhere
        let second = coordinator
            .book(&user_id("U1"), &center_id("vc2"), Day::new(1))
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(coordinator.active_booking_for_user(&user_id("U1")).unwrap(), second);
        assert_eq!(coordinator.total_count(), 3);
        assert_eq!(coordinator.active_count(), 2);
    }

    #[test]
    fn cancel_without_booking() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        assert_eq!(
            coordinator.cancel(&user_id("U3")),
            Err(BookingError::NoActiveBooking {
                user_id: user_id("U3")
            })
        );
        assert_eq!(
            coordinator.cancel(&user_id("nobody")),
            Err(BookingError::not_found(Entity::User, "nobody"))
        );
    }

    #[test]
    fn cancelled_history_stays_queryable() {
        init_test_tracing();
        let coordinator = seeded_coordinator();

        let booking = coordinator
            .book(&user_id("U5"), &center_id("vc3"), Day::new(3))
            .unwrap();
        coordinator.cancel(&user_id("U5")).unwrap();

        let stored = coordinator.get_booking(&booking.id).unwrap();
        assert!(!stored.is_active());
        assert!(coordinator.list_for_center(&center_id("vc3")).is_empty());
        assert_eq!(coordinator.centers().available(&center_id("vc3"), Day::new(3)).unwrap(), 4);
    }
}

mod registry_tests {
    use super::*;

    #[test]
    fn center_loaded_from_json_starts_empty() {
        let coordinator = seeded_coordinator();
        let center: Center = serde_json::from_str(
            r#"{
                "id": "vc9",
                "name": "Loaded",
                "district": "d1",
                "state_name": null,
                "default_capacity": 2,
                "booking_count_by_day": {"1": 7}
            }"#,
        )
        .unwrap();
        coordinator.centers().register(center).unwrap();

        assert_eq!(coordinator.centers().available(&center_id("vc9"), Day::new(1)).unwrap(), 2);
        coordinator
            .book(&user_id("U1"), &center_id("vc9"), Day::new(1))
            .unwrap();
        let center = coordinator.centers().get(&center_id("vc9")).unwrap();
        assert_eq!(center.booked(Day::new(1)), 1);
        assert_eq!(coordinator.list_for_center_day(&center_id("vc9"), Day::new(1)).len(), 1);
    }

    #[test]
    fn district_listing() {
        let coordinator = seeded_coordinator();

        let d1: Vec<_> = coordinator
            .centers()
            .list_by_district(&DistrictId::new("d1"))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(d1, vec![center_id("vc1"), center_id("vc2")]);
        assert!(coordinator
            .centers()
            .list_by_district(&DistrictId::new("d9"))
            .is_empty());

        // Dobby lives in d2, which has no center
        assert!(coordinator
            .centers_near_user(&user_id("U5"))
            .unwrap()
            .is_empty());
        assert_eq!(coordinator.centers_near_user(&user_id("U1")).unwrap().len(), 2);
    }

    #[test]
    fn district_is_not_enforced_when_booking() {
        let coordinator = seeded_coordinator();
        // U5 (d2) at vc3 (d3)
        assert!(coordinator
            .book(&user_id("U5"), &center_id("vc3"), Day::new(3))
            .is_ok());
    }

    #[test]
    fn duplicate_registrations_are_refused() {
        let coordinator = seeded_coordinator();

        assert_eq!(
            coordinator
                .users()
                .register(User::new("U1", "Someone Else", 50, "d3")),
            Err(BookingError::duplicate(Entity::User, "U1"))
        );
        assert_eq!(
            coordinator
                .centers()
                .register(Center::new("vc1", "d9", Capacity::new(1))),
            Err(BookingError::duplicate(Entity::Center, "vc1"))
        );
        assert_eq!(coordinator.users().get(&user_id("U1")).unwrap().name, "Harry");
    }

    #[test]
    fn center_metadata_is_kept() {
        let coordinator = seeded_coordinator();
        coordinator
            .centers()
            .register(
                Center::new("vc4", "d2", Capacity::new(2))
                    .with_name("Hogsmeade Clinic")
                    .with_state_name("Scotland")
                    .with_day_capacity(Day::new(2), Capacity::new(1)),
            )
            .unwrap();

        let snapshot = coordinator.centers().snapshot(&center_id("vc4")).unwrap();
        assert_eq!(snapshot.name, "Hogsmeade Clinic");
        assert_eq!(snapshot.state_name.as_deref(), Some("Scotland"));
        assert_eq!(coordinator.centers().available(&center_id("vc4"), Day::new(2)).unwrap(), 1);
        assert_eq!(coordinator.centers_near_user(&user_id("U5")).unwrap().len(), 1);
    }
}

mod capacity_policy_tests {
    use super::*;

    fn single_center(policy: CapacityPolicy) -> vaxbook_core::BookingCoordinator {
        let coordinator =
            coordinator_with(&BookingConfig::default().with_capacity_policy(policy));
        for id in ["A", "B", "C"] {
            coordinator
                .users()
                .register(User::new(id, format!("User {id}"), 40, "d1"))
                .unwrap();
        }
        coordinator
            .centers()
            .register(Center::new("vc1", "d1", Capacity::new(3)))
            .unwrap();
        for id in ["A", "B", "C"] {
            coordinator
                .book(&user_id(id), &center_id("vc1"), Day::new(1))
                .unwrap();
        }
        coordinator
    }

    #[test]
    fn reject_keeps_existing_capacity() {
        let coordinator = single_center(CapacityPolicy::Reject);
        let result = coordinator.centers().set_day_capacity(
            &center_id("vc1"),
            Day::new(1),
            Capacity::new(1),
        );
        assert!(matches!(
            result,
            Err(BookingError::CapacityBelowActive {
                requested: 1,
                active: 3,
                ..
            })
        ));
        assert_eq!(coordinator.list_for_center_day(&center_id("vc1"), Day::new(1)).len(), 3);
    }

    #[test]
    fn oversell_keeps_bookings_and_blocks_new_ones() {
        let coordinator = single_center(CapacityPolicy::AllowOversell);
        coordinator
            .centers()
            .set_day_capacity(&center_id("vc1"), Day::new(1), Capacity::new(1))
            .unwrap();
        assert_eq!(coordinator.active_count(), 3);

        coordinator.cancel(&user_id("A")).unwrap();
        assert!(matches!(
            coordinator.book(&user_id("A"), &center_id("vc1"), Day::new(1)),
            Err(BookingError::CapacityExceeded { capacity: 1, .. })
        ));

        coordinator.cancel(&user_id("B")).unwrap();
        coordinator.cancel(&user_id("C")).unwrap();
        assert!(coordinator
            .book(&user_id("A"), &center_id("vc1"), Day::new(1))
            .is_ok());
    }

    #[test]
    fn minimum_age_is_configurable() {
        let coordinator = coordinator_with(&BookingConfig::default().with_minimum_age(12));
        coordinator
            .users()
            .register(User::new("kid", "Draco", 15, "d1"))
            .unwrap();
        coordinator
            .centers()
            .register(Center::new("vc1", "d1", Capacity::new(1)))
            .unwrap();
        assert!(coordinator
            .book(&user_id("kid"), &center_id("vc1"), Day::new(0))
            .is_ok());
    }
}

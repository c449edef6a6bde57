//! Metrics emitted by the registries and the coordinator.
//!
//! The crate only records through the `metrics` facade. Installing an
//! exporter (Prometheus or otherwise) is left to the embedding service; without
//! one, every call here is a no-op.

use metrics::{Unit, describe_counter, describe_gauge};

/// Bookings admitted.
pub const BOOKINGS_ADMITTED: &str = "vaxbook.bookings.admitted";
/// Booking requests rejected, labelled by `reason`.
pub const BOOKINGS_REJECTED: &str = "vaxbook.bookings.rejected";
/// Bookings cancelled.
pub const BOOKINGS_CANCELLED: &str = "vaxbook.bookings.cancelled";
/// Bookings currently active across all centers.
pub const BOOKINGS_ACTIVE: &str = "vaxbook.bookings.active";
/// Records registered, labelled by `entity`.
pub const REGISTRATIONS: &str = "vaxbook.registrations";

/// Describe every metric so exporters can render help text.
///
/// Safe to call more than once.
pub fn register_metrics() {
    describe_counter!(BOOKINGS_ADMITTED, Unit::Count, "Bookings admitted");
    describe_counter!(
        BOOKINGS_REJECTED,
        Unit::Count,
        "Booking requests rejected, by reason"
    );
    describe_counter!(BOOKINGS_CANCELLED, Unit::Count, "Bookings cancelled");
    describe_gauge!(
        BOOKINGS_ACTIVE,
        Unit::Count,
        "Bookings currently holding a slot"
    );
    describe_counter!(REGISTRATIONS, Unit::Count, "Users and centers registered");
}

pub(crate) fn record_admitted() {
    metrics::counter!(BOOKINGS_ADMITTED).increment(1);
}

pub(crate) fn record_rejected(reason: &'static str) {
    metrics::counter!(BOOKINGS_REJECTED, "reason" => reason).increment(1);
}

pub(crate) fn record_cancelled() {
    metrics::counter!(BOOKINGS_CANCELLED).increment(1);
}

pub(crate) fn record_registration(entity: &'static str) {
    metrics::counter!(REGISTRATIONS, "entity" => entity).increment(1);
}

/// Publish the active booking count. Callers hold the ledger write lock, so
/// concurrent updates reach the gauge in ledger order.
pub(crate) fn set_active(active: usize) {
    // Active bookings are bounded by total capacity, well inside f64's exact range
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(BOOKINGS_ACTIVE).set(active as f64);
}

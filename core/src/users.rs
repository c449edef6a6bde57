//! User registry.
//!
//! Stores user records keyed by id and owns each user's [`BookingSlot`]. The
//! slot is only changed through the narrow `claim`/`commit`/`abandon`/`release`
//! transitions used by the coordinator; each one is atomic per user.

use crate::error::{BookingError, Entity, Result};
use crate::metrics;
use crate::sync::{lock, read, write};
use crate::types::{BookingSlot, User, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug)]
struct UserEntry {
    user: User,
    slot: BookingSlot,
}

#[derive(Debug, Default)]
struct UserTable {
    /// Registration order
    order: Vec<UserId>,
    entries: HashMap<UserId, Arc<Mutex<UserEntry>>>,
}

/// Registry of users.
///
/// Safe to share across threads. Lookups take a read lock on the index and
/// then the per-user mutex; registration takes the index write lock.
#[derive(Debug, Default)]
pub struct UserRegistry {
    table: RwLock<UserTable>,
}

impl UserRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidRecord`] if the id or name is blank
    /// - [`BookingError::DuplicateId`] if the id is already registered
    pub fn register(&self, user: User) -> Result<()> {
        if user.id.as_str().trim().is_empty() {
            return Err(BookingError::InvalidRecord(
                "user id cannot be empty".to_string(),
            ));
        }
        if user.name.trim().is_empty() {
            return Err(BookingError::InvalidRecord(format!(
                "user {} has an empty name",
                user.id
            )));
        }

        let mut table = write(&self.table);
        if table.entries.contains_key(&user.id) {
            tracing::warn!(user_id = %user.id, "Rejected duplicate user registration");
            return Err(BookingError::duplicate(Entity::User, &user.id));
        }

        tracing::info!(
            user_id = %user.id,
            district = %user.district,
            age = user.age,
            "Registered user"
        );

        let id = user.id.clone();
        table.order.push(id.clone());
        table.entries.insert(
            id,
            Arc::new(Mutex::new(UserEntry {
                user,
                slot: BookingSlot::Free,
            })),
        );
        metrics::record_registration("user");
        Ok(())
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown id.
    pub fn get(&self, user_id: &UserId) -> Result<User> {
        let entry = self.entry(user_id)?;
        let guard = lock(&entry);
        Ok(guard.user.clone())
    }

    /// Current booking slot of a user.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown id.
    pub fn slot(&self, user_id: &UserId) -> Result<BookingSlot> {
        let entry = self.entry(user_id)?;
        let slot = lock(&entry).slot;
        Ok(slot)
    }

    /// Whether the user holds an active booking.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown id.
    pub fn has_active_booking(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.slot(user_id)? == BookingSlot::Held)
    }

    /// All users in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<User> {
        let table = read(&self.table);
        table
            .order
            .iter()
            .filter_map(|id| table.entries.get(id))
            .map(|entry| lock(entry).user.clone())
            .collect()
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.table).order.len()
    }

    /// Whether no user is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Free -> Pending`. The per-user check-and-set that admits one booking
    /// attempt at a time.
    pub(crate) fn claim(&self, user_id: &UserId) -> Result<User> {
        let entry = self.entry(user_id)?;
        let mut guard = lock(&entry);
        if guard.slot.is_taken() {
            return Err(BookingError::AlreadyBooked {
                user_id: user_id.clone(),
            });
        }
        guard.slot = BookingSlot::Pending;
        Ok(guard.user.clone())
    }

    /// `Pending -> Held`, once the booking is recorded.
    pub(crate) fn commit(&self, user_id: &UserId) -> Result<()> {
        let entry = self.entry(user_id)?;
        let mut guard = lock(&entry);
        if guard.slot != BookingSlot::Pending {
            return Err(BookingError::InconsistentState(format!(
                "user {user_id} committed a booking from slot {:?}",
                guard.slot
            )));
        }
        guard.slot = BookingSlot::Held;
        Ok(())
    }

    /// `Pending -> Free`, when admission failed after the claim or a
    /// cancellation has finished.
    pub(crate) fn abandon(&self, user_id: &UserId) {
        let Ok(entry) = self.entry(user_id) else {
            return;
        };
        let mut guard = lock(&entry);
        if guard.slot == BookingSlot::Pending {
            guard.slot = BookingSlot::Free;
        } else {
            tracing::warn!(user_id = %user_id, slot = ?guard.slot, "Abandon on a slot that was not pending");
        }
    }

    /// `Held -> Pending`, at the start of a cancellation. The slot stays taken
    /// until the coordinator calls [`Self::abandon`], so a rebooking cannot
    /// overtake the ledger update. A pending slot is not cancellable.
    pub(crate) fn release(&self, user_id: &UserId) -> Result<()> {
        let entry = self.entry(user_id)?;
        let mut guard = lock(&entry);
        if guard.slot != BookingSlot::Held {
            return Err(BookingError::NoActiveBooking {
                user_id: user_id.clone(),
            });
        }
        guard.slot = BookingSlot::Pending;
        Ok(())
    }

    fn entry(&self, user_id: &UserId) -> Result<Arc<Mutex<UserEntry>>> {
        read(&self.table)
            .entries
            .get(user_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found(Entity::User, user_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry() -> UserRegistry {
        let users = UserRegistry::new();
        users.register(User::new("U1", "Harry", 35, "d1")).unwrap();
        users.register(User::new("U2", "Ron", 30, "d1")).unwrap();
        users
    }

    #[test]
    fn register_and_get() {
        let users = registry();
        let harry = users.get(&UserId::new("U1")).unwrap();
        assert_eq!(harry.name, "Harry");
        assert_eq!(users.len(), 2);
        assert!(!users.has_active_booking(&UserId::new("U1")).unwrap());
    }

    #[test]
    fn duplicate_id_is_rejected_and_original_kept() {
        let users = registry();
        let result = users.register(User::new("U1", "Impostor", 99, "d9"));
        assert_eq!(
            result,
            Err(BookingError::DuplicateId {
                entity: Entity::User,
                id: "U1".to_string()
            })
        );
        assert_eq!(users.get(&UserId::new("U1")).unwrap().name, "Harry");
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn blank_fields_are_invalid() {
        let users = UserRegistry::new();
        assert!(matches!(
            users.register(User::new("", "Nobody", 30, "d1")),
            Err(BookingError::InvalidRecord(_))
        ));
        assert!(matches!(
            users.register(User::new("U9", "  ", 30, "d1")),
            Err(BookingError::InvalidRecord(_))
        ));
        assert!(users.is_empty());
    }

    #[test]
    fn unknown_user_is_not_found() {
        let users = registry();
        assert_eq!(
            users.get(&UserId::new("U404")),
            Err(BookingError::not_found(Entity::User, "U404"))
        );
    }

    #[test]
    fn list_keeps_registration_order() {
        let users = registry();
        let names: Vec<_> = users.list().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Harry", "Ron"]);
    }

    #[test]
    fn slot_transitions() {
        let users = registry();
        let id = UserId::new("U1");

        users.claim(&id).unwrap();
        assert_eq!(users.slot(&id).unwrap(), BookingSlot::Pending);
        assert_eq!(
            users.claim(&id),
            Err(BookingError::AlreadyBooked { user_id: id.clone() })
        );
        // Pending is not cancellable
        assert_eq!(
            users.release(&id),
            Err(BookingError::NoActiveBooking { user_id: id.clone() })
        );

        users.commit(&id).unwrap();
        assert!(users.has_active_booking(&id).unwrap());

        users.release(&id).unwrap();
        assert_eq!(users.slot(&id).unwrap(), BookingSlot::Pending);
        assert!(users.claim(&id).is_err());
        users.abandon(&id);
        assert_eq!(users.slot(&id).unwrap(), BookingSlot::Free);
    }

    #[test]
    fn abandon_returns_pending_slot() {
        let users = registry();
        let id = UserId::new("U2");
        users.claim(&id).unwrap();
        users.abandon(&id);
        assert_eq!(users.slot(&id).unwrap(), BookingSlot::Free);
    }

    #[test]
    fn commit_without_claim_is_inconsistent() {
        let users = registry();
        assert!(matches!(
            users.commit(&UserId::new("U1")),
            Err(BookingError::InconsistentState(_))
        ));
    }
}

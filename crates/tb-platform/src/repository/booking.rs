//! Ticket Booking Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use indexmap::IndexMap;
use mongodb::{Collection, Database, bson::doc, options::ReturnDocument};
use parking_lot::RwLock;

use crate::domain::Booking;
use crate::error::{PlatformError, Result};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>>;

    async fn find_all(&self) -> Result<Vec<Booking>>;

    /// Atomically add `tickets` to the stored count.
    ///
    /// Fails with a validation error, leaving the booking untouched, when the
    /// new count would not fit in an `i64`.
    async fn add_tickets(&self, id: &str, tickets: i64) -> Result<Option<Booking>>;

    /// Remove a booking. Returns whether a record was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub struct MongoBookingRepository {
    collection: Collection<Booking>,
}

impl MongoBookingRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("ticketbookings"),
        }
    }
}

#[async_trait]
impl BookingRepository for MongoBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        self.collection.insert_one(booking).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_all(&self) -> Result<Vec<Booking>> {
        let cursor = self.collection
            .find(doc! {})
            .sort(doc! { "bookingDate": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add_tickets(&self, id: &str, tickets: i64) -> Result<Option<Booking>> {
        let Some(ceiling) = i64::MAX.checked_sub(tickets) else {
            return Err(tickets_overflow(id));
        };
        let updated = self.collection
            .find_one_and_update(
                doc! { "_id": id, "ticketsBooked": { "$lte": ceiling } },
                doc! { "$inc": { "ticketsBooked": tickets } },
            )
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(booking) => Ok(Some(booking)),
            None if self.find_by_id(id).await?.is_some() => Err(tickets_overflow(id)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

fn tickets_overflow(id: &str) -> PlatformError {
    PlatformError::validation(format!("\"tickets\" is too large for ticket booking {}", id))
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<IndexMap<String, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.read().is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        self.bookings.write().insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>> {
        Ok(self.bookings.read().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Booking>> {
        Ok(self.bookings.read().values().cloned().collect())
    }

    async fn add_tickets(&self, id: &str, tickets: i64) -> Result<Option<Booking>> {
        let mut bookings = self.bookings.write();
        let Some(booking) = bookings.get_mut(id) else {
            return Ok(None);
        };
        booking.tickets_booked = booking
            .tickets_booked
            .checked_add(tickets)
            .ok_or_else(|| tickets_overflow(id))?;
        Ok(Some(booking.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.bookings.write().shift_remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_find_and_list_in_order() {
        let repo = InMemoryBookingRepository::new();
        let first = Booking::new("a1", "e1", 2, "txn_1");
        let second = Booking::new("a2", "e1", 1, "txn_2");
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        assert_eq!(repo.find_by_id(&first.id).await.unwrap(), Some(first.clone()));
        let ids: Vec<String> = repo.find_all().await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_add_tickets_keeps_booking_date() {
        let repo = InMemoryBookingRepository::new();
        let booking = Booking::new("a1", "e1", 2, "txn_1");
        repo.insert(&booking).await.unwrap();

        let updated = repo.add_tickets(&booking.id, 3).await.unwrap().unwrap();
        assert_eq!(updated.tickets_booked, 5);
        assert_eq!(updated.booking_date, booking.booking_date);
        assert!(repo.add_tickets("missing", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_tickets_rejects_overflow() {
        let repo = InMemoryBookingRepository::new();
        let booking = Booking::new("a1", "e1", 2, "txn_1");
        repo.insert(&booking).await.unwrap();

        let err = repo.add_tickets(&booking.id, i64::MAX).await.unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));
        assert_eq!(repo.find_by_id(&booking.id).await.unwrap().unwrap().tickets_booked, 2);

        let updated = repo.add_tickets(&booking.id, i64::MAX - 2).await.unwrap().unwrap();
        assert_eq!(updated.tickets_booked, i64::MAX);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryBookingRepository::new();
        let booking = Booking::new("a1", "e1", 2, "txn_1");
        repo.insert(&booking).await.unwrap();

        assert!(repo.delete(&booking.id).await.unwrap());
        assert!(!repo.delete(&booking.id).await.unwrap());
        assert!(repo.is_empty());
    }
}

//! Event Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use indexmap::IndexMap;
use mongodb::{Collection, Database, bson::doc, options::ReturnDocument};
use parking_lot::RwLock;

use crate::domain::Event;
use crate::error::Result;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>>;

    /// Events with at least one ticket left
    async fn find_available(&self) -> Result<Vec<Event>>;

    /// Subtract `tickets` in one atomic step, only if at least that many remain.
    ///
    /// Returns the updated event, or `None` when the event is unknown or has
    /// too few tickets.
    async fn decrement_if_available(&self, id: &str, tickets: i64) -> Result<Option<Event>>;
}

pub struct MongoEventRepository {
    collection: Collection<Event>,
}

impl MongoEventRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("events"),
        }
    }
}

#[async_trait]
impl EventRepository for MongoEventRepository {
    async fn insert(&self, event: &Event) -> Result<()> {
        self.collection.insert_one(event).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_available(&self) -> Result<Vec<Event>> {
        let cursor = self.collection
            .find(doc! { "ticketAvailability": { "$gt": 0 } })
            .sort(doc! { "date": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn decrement_if_available(&self, id: &str, tickets: i64) -> Result<Option<Event>> {
        let filter = doc! {
            "_id": id,
            "ticketAvailability": { "$gte": tickets },
        };
        let update = doc! { "$inc": { "ticketAvailability": -tickets } };

        Ok(self.collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[derive(Default)]
pub struct InMemoryEventRepository {
    events: RwLock<IndexMap<String, Event>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &Event) -> Result<()> {
        self.events.write().insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.events.read().get(id).cloned())
    }

    async fn find_available(&self) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self.events
            .read()
            .values()
            .filter(|e| e.ticket_availability > 0)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn decrement_if_available(&self, id: &str, tickets: i64) -> Result<Option<Event>> {
        let mut events = self.events.write();
        match events.get_mut(id) {
            Some(event) if event.has_tickets(tickets) => {
                event.ticket_availability -= tickets;
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_find_available_skips_sold_out() {
        let repo = InMemoryEventRepository::new();
        let later = Event::new("Later", "Berlin", Utc::now() + Duration::days(10), 3).with_id("later");
        let sooner = Event::new("Sooner", "Paris", Utc::now() + Duration::days(1), 1).with_id("sooner");
        let sold_out = Event::new("Sold out", "Rome", Utc::now(), 0).with_id("gone");
        for e in [&later, &sooner, &sold_out] {
            repo.insert(e).await.unwrap();
        }

        let ids: Vec<String> = repo.find_available().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["sooner", "later"]);
    }

    #[tokio::test]
    async fn test_decrement_is_conditional() {
        let repo = InMemoryEventRepository::new();
        repo.insert(&Event::new("E1", "Lisbon", Utc::now(), 5).with_id("e1")).await.unwrap();

        let updated = repo.decrement_if_available("e1", 3).await.unwrap().unwrap();
        assert_eq!(updated.ticket_availability, 2);

        assert!(repo.decrement_if_available("e1", 3).await.unwrap().is_none());
        assert_eq!(repo.find_by_id("e1").await.unwrap().unwrap().ticket_availability, 2);

        assert!(repo.decrement_if_available("missing", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_decrements_never_go_negative() {
        let repo = std::sync::Arc::new(InMemoryEventRepository::new());
        repo.insert(&Event::new("E1", "Lisbon", Utc::now(), 5).with_id("e1")).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.decrement_if_available("e1", 1).await.unwrap().is_some() })
            })
            .collect();

        let mut succeeded = 0;
        for h in handles {
            if h.await.unwrap() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 5);
        assert_eq!(repo.find_by_id("e1").await.unwrap().unwrap().ticket_availability, 0);
    }
}

//! Attendee Repository

use async_trait::async_trait;
use indexmap::IndexMap;
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use parking_lot::RwLock;
use tb_common::MealPreference;
use tracing::info;

use crate::domain::Attendee;
use crate::error::{PlatformError, Result};

const DUPLICATE_KEY: i32 = 11000;

#[async_trait]
pub trait AttendeeRepository: Send + Sync {
    /// Insert a new attendee. A second attendee with the same email is a
    /// [`PlatformError::Duplicate`].
    async fn insert(&self, attendee: &Attendee) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Attendee>>;

    async fn update_meal_preference(&self, id: &str, meal: MealPreference) -> Result<Option<Attendee>>;

    async fn set_registered(&self, id: &str, registered: bool) -> Result<Option<Attendee>>;
}

pub struct MongoAttendeeRepository {
    collection: Collection<Attendee>,
}

impl MongoAttendeeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("attendees"),
        }
    }

    /// Create the unique email index. Safe to call on every startup.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).name("attendee_email_unique".to_string()).build())
            .build();
        self.collection.create_index(index).await?;
        info!("Ensured unique email index on attendees");
        Ok(())
    }

    async fn update_one_returning(&self, id: &str, update: mongodb::bson::Document) -> Result<Option<Attendee>> {
        Ok(self.collection
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl AttendeeRepository for MongoAttendeeRepository {
    async fn insert(&self, attendee: &Attendee) -> Result<()> {
        match self.collection.insert_one(attendee).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(PlatformError::duplicate("Attendee", "email", &attendee.email)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attendee>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn update_meal_preference(&self, id: &str, meal: MealPreference) -> Result<Option<Attendee>> {
        self.update_one_returning(id, doc! { "$set": { "preferences.meal": meal.as_str() } })
            .await
    }

    async fn set_registered(&self, id: &str, registered: bool) -> Result<Option<Attendee>> {
        self.update_one_returning(id, doc! { "$set": { "isRegistered": registered } })
            .await
    }
}

#[derive(Default)]
pub struct InMemoryAttendeeRepository {
    attendees: RwLock<IndexMap<String, Attendee>>,
}

impl InMemoryAttendeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Attendee)) -> Option<Attendee> {
        let mut attendees = self.attendees.write();
        attendees.get_mut(id).map(|a| {
            f(a);
            a.clone()
        })
    }
}

#[async_trait]
impl AttendeeRepository for InMemoryAttendeeRepository {
    async fn insert(&self, attendee: &Attendee) -> Result<()> {
        let mut attendees = self.attendees.write();
        if attendees.values().any(|a| a.email == attendee.email) {
            return Err(PlatformError::duplicate("Attendee", "email", &attendee.email));
        }
        attendees.insert(attendee.id.clone(), attendee.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attendee>> {
        Ok(self.attendees.read().get(id).cloned())
    }

    async fn update_meal_preference(&self, id: &str, meal: MealPreference) -> Result<Option<Attendee>> {
        Ok(self.modify(id, |a| a.set_meal(meal)))
    }

    async fn set_registered(&self, id: &str, registered: bool) -> Result<Option<Attendee>> {
        Ok(self.modify(id, |a| a.is_registered = registered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryAttendeeRepository::new();
        repo.insert(&Attendee::new("Ada", "ada@example.com", "1", "e1", 1)).await.unwrap();

        let err = repo
            .insert(&Attendee::new("Ada Again", "ada@example.com", "2", "e2", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_update_meal_and_registration() {
        let repo = InMemoryAttendeeRepository::new();
        repo.insert(&Attendee::new("Ada", "ada@example.com", "1", "e1", 1).with_id("a1"))
            .await
            .unwrap();

        let updated = repo.update_meal_preference("a1", MealPreference::Vegan).await.unwrap().unwrap();
        assert_eq!(updated.preferences.meal, MealPreference::Vegan);

        let updated = repo.set_registered("a1", false).await.unwrap().unwrap();
        assert!(!updated.is_registered);

        assert!(repo.update_meal_preference("nope", MealPreference::Vegan).await.unwrap().is_none());
    }
}

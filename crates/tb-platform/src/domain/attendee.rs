//! Attendee Entity

use serde::{Deserialize, Serialize};
use tb_common::{AttendeeView, MealPreference, Preferences};

/// An attendee registered with the Attendee Management service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Unique across attendees
    pub email: String,

    pub phone: String,

    /// Event the attendee registered for
    #[serde(rename = "event")]
    pub event_id: String,

    pub tickets_booked: i64,

    /// Must be set before any booking may reference this attendee
    #[serde(default)]
    pub is_registered: bool,

    #[serde(default)]
    pub preferences: Preferences,
}

impl Attendee {
    /// Create a registered attendee with the default meal preference
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        event_id: impl Into<String>,
        tickets_booked: i64,
    ) -> Self {
        Self {
            id: super::new_id(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            event_id: event_id.into(),
            tickets_booked,
            is_registered: true,
            preferences: Preferences::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn unregistered(mut self) -> Self {
        self.is_registered = false;
        self
    }

    pub fn set_meal(&mut self, meal: MealPreference) {
        self.preferences.meal = meal;
    }
}

impl From<Attendee> for AttendeeView {
    fn from(a: Attendee) -> Self {
        Self {
            id: a.id,
            name: a.name,
            email: a.email,
            phone: a.phone,
            event: a.event_id,
            tickets_booked: a.tickets_booked,
            is_registered: a.is_registered,
            preferences: a.preferences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_attendee_is_registered_vegetarian() {
        let attendee = Attendee::new("Ada", "ada@example.com", "555-0100", "e1", 2);
        assert!(attendee.is_registered);
        assert_eq!(attendee.preferences.meal, MealPreference::Vegetarian);
        assert!(!attendee.unregistered().is_registered);
    }

    #[test]
    fn test_stored_document_shape() {
        let mut attendee = Attendee::new("Ada", "ada@example.com", "555-0100", "e1", 2).with_id("a1");
        attendee.set_meal(MealPreference::NonVegetarian);

        let doc = bson::to_document(&attendee).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), "a1");
        assert_eq!(doc.get_str("event").unwrap(), "e1");
        assert_eq!(
            doc.get_document("preferences").unwrap().get_str("meal").unwrap(),
            "non-vegetarian"
        );
    }

    #[test]
    fn test_missing_registration_flag_reads_as_unregistered() {
        let doc = bson::doc! {
            "_id": "a1",
            "name": "Ada",
            "email": "ada@example.com",
            "phone": "555",
            "event": "e1",
            "ticketsBooked": 1_i64,
        };
        let attendee: Attendee = bson::from_document(doc).unwrap();
        assert!(!attendee.is_registered);
        assert_eq!(attendee.preferences.meal, MealPreference::Vegetarian);
    }
}

//! # Customer Feedback Types
//!
//! Feedback is created `pending` and only shown publicly once an admin
//! approves it.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "feedback_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::str::FromStr for FeedbackStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FeedbackStatus::Pending),
            "approved" => Ok(FeedbackStatus::Approved),
            "rejected" => Ok(FeedbackStatus::Rejected),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Option<Uuid>,
    pub name: String,
    pub rating: i16,
    pub text: String,
    pub status: FeedbackStatus,
    pub admin_response: Option<String>,
    pub responded_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub responded_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields exposed by the public listing
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicFeedback {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub rating: i16,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_only_known_values() {
        assert_eq!("approved".parse::<FeedbackStatus>(), Ok(FeedbackStatus::Approved));
        assert_eq!("pending".parse::<FeedbackStatus>(), Ok(FeedbackStatus::Pending));
        assert!("Approved".parse::<FeedbackStatus>().is_err());
        assert!("archived".parse::<FeedbackStatus>().is_err());
    }

    #[test]
    fn feedback_serializes_the_author_as_user() {
        let now = OffsetDateTime::now_utc();
        let feedback = Feedback {
            id: Uuid::new_v4(),
            user_id: None,
            name: "Ann".into(),
            rating: 5,
            text: "Great".into(),
            status: FeedbackStatus::Pending,
            admin_response: None,
            responded_by: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&feedback).unwrap();
        assert!(json.get("user").is_some());
        assert_eq!(json["status"], "pending");
        assert!(json["respondedAt"].is_null());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validate::{RuleSet, Submission};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub feedback: String,
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFeedback {
    pub name: Option<String>,
    pub email: Option<String>,
    pub feedback: String,
    pub rating: i64,
}

impl CreateFeedback {
    /// Validate a raw submission against the feedback rules and build the
    /// record to insert. Text is stored trimmed.
    pub fn from_submission(submission: &Submission) -> Result<Self, ValidationError> {
        RuleSet::feedback().validate(submission)?;
        let rating = submission
            .text("rating")
            .and_then(|r| r.parse().ok())
            .ok_or_else(|| ValidationError::new("Rating must be between 1 and 5"))?;
        Ok(Self {
            name: submission.text("name").map(str::to_string),
            email: submission.text("email").map(str::to_string),
            feedback: submission.text("feedback").unwrap_or_default().to_string(),
            rating,
        })
    }
}

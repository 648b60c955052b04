//! Submission validation.
//!
//! Every endpoint owns a [`RuleSet`]: an ordered list of field rules. A
//! submission is checked rule by rule and the first violation is reported;
//! violations are never aggregated.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ValidationError;
use crate::order::Catalog;

pub const FILE_REQUIRED: &str = "File is required";

/// Raw customer input: field name to text value.
///
/// JSON bodies, urlencoded forms and multipart text parts all end up here,
/// so the rules only ever see strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: BTreeMap<String, String>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    /// The raw value as submitted.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// The trimmed value, or `None` when absent or blank.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Interpret a checkbox-style flag. Absent, blank, `false`, `0`, `off`
    /// and `no` are all false.
    pub fn flag(&self, field: &str) -> bool {
        match self.text(field) {
            None => false,
            Some(v) => !matches!(
                v.to_ascii_lowercase().as_str(),
                "false" | "0" | "off" | "no"
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build from a JSON body. Scalars are rendered to text, `null` counts
    /// as absent and nested values keep their JSON text so typed rules
    /// reject them.
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let Value::Object(map) = body else {
            return Err(ValidationError::new("Request body must be a JSON object"));
        };
        let mut submission = Self::new();
        for (field, value) in map {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            submission.insert(field, text);
        }
        Ok(submission)
    }
}

impl FromIterator<(String, String)> for Submission {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    NotEmpty,
    Email,
    IntRange { min: i64, max: i64 },
    OneOf(&'static [&'static str]),
}

impl Rule {
    pub fn check(&self, value: Option<&str>) -> bool {
        let Some(value) = value.map(str::trim) else {
            return false;
        };
        match self {
            Rule::NotEmpty => !value.is_empty(),
            Rule::Email => is_valid_email(value),
            Rule::IntRange { min, max } => value
                .parse::<i64>()
                .map(|n| (*min..=*max).contains(&n))
                .unwrap_or(false),
            Rule::OneOf(allowed) => allowed.contains(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn feedback() -> Self {
        Self::new(vec![
            FieldRule {
                field: "feedback",
                rule: Rule::NotEmpty,
                message: "Feedback is required",
            },
            FieldRule {
                field: "rating",
                rule: Rule::IntRange { min: 1, max: 5 },
                message: "Rating must be between 1 and 5",
            },
        ])
    }

    /// Text-field rules for an order. File presence is checked separately
    /// because the file never travels through a [`Submission`].
    pub fn order(catalog: Catalog) -> Self {
        Self::new(vec![
            FieldRule {
                field: "name",
                rule: Rule::NotEmpty,
                message: "Name is required",
            },
            FieldRule {
                field: "email",
                rule: Rule::Email,
                message: "Valid email is required",
            },
            FieldRule {
                field: catalog.field_name(),
                rule: Rule::OneOf(catalog.values()),
                message: "Invalid service type",
            },
            FieldRule {
                field: "details",
                rule: Rule::NotEmpty,
                message: "Order details are required",
            },
        ])
    }

    pub fn validate(&self, submission: &Submission) -> Result<(), ValidationError> {
        match self
            .rules
            .iter()
            .find(|r| !r.rule.check(submission.get(r.field)))
        {
            Some(violation) => Err(ValidationError::new(violation.message)),
            None => Ok(()),
        }
    }
}

/// Pragmatic address syntax check: `local@domain.tld`, no whitespace,
/// hostname-style domain labels and an alphabetic TLD of two or more letters.
pub fn is_valid_email(address: &str) -> bool {
    if address.len() > 254 || address.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = address.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || local.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let label_ok = |label: &&str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if !labels.iter().all(label_ok) {
        return false;
    }
    labels
        .last()
        .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feedback_rules_accept_valid_submission() {
        let sub = Submission::new()
            .with("feedback", "Great service")
            .with("rating", "5");
        assert!(RuleSet::feedback().validate(&sub).is_ok());
    }

    #[test]
    fn feedback_rules_reject_empty_feedback_first() {
        let sub = Submission::new().with("feedback", "   ").with("rating", "9");
        let err = RuleSet::feedback().validate(&sub).unwrap_err();
        assert_eq!(err.message(), "Feedback is required");
    }

    #[test]
    fn feedback_rules_reject_out_of_range_ratings() {
        for rating in ["0", "6", "-1", "4.5", "five", ""] {
            let sub = Submission::new()
                .with("feedback", "ok")
                .with("rating", rating);
            let err = RuleSet::feedback().validate(&sub).unwrap_err();
            assert_eq!(err.message(), "Rating must be between 1 and 5", "rating={rating:?}");
        }
    }

    #[test]
    fn feedback_rules_reject_missing_rating() {
        let sub = Submission::new().with("feedback", "ok");
        assert!(RuleSet::feedback().validate(&sub).is_err());
    }

    #[test]
    fn order_rules_report_first_violation_only() {
        let sub = Submission::new().with("email", "not-an-email");
        let err = RuleSet::order(Catalog::Service).validate(&sub).unwrap_err();
        assert_eq!(err.message(), "Name is required");

        let sub = sub.with("name", "A");
        let err = RuleSet::order(Catalog::Service).validate(&sub).unwrap_err();
        assert_eq!(err.message(), "Valid email is required");
    }

    #[test]
    fn order_rules_do_not_conflate_catalogs() {
        let base = Submission::new()
            .with("name", "A")
            .with("email", "a@b.com")
            .with("details", "2 copies");

        let poster = base.clone().with("service", "poster");
        assert!(RuleSet::order(Catalog::Service).validate(&poster).is_ok());

        let bw_as_service = base.clone().with("service", "bw");
        let err = RuleSet::order(Catalog::Service)
            .validate(&bw_as_service)
            .unwrap_err();
        assert_eq!(err.message(), "Invalid service type");

        let bw = base.clone().with("orderType", "bw");
        assert!(RuleSet::order(Catalog::OrderType).validate(&bw).is_ok());
        assert!(RuleSet::order(Catalog::OrderType).validate(&poster).is_err());
    }

    #[test]
    fn order_rules_require_details() {
        let sub = Submission::new()
            .with("name", "A")
            .with("email", "a@b.com")
            .with("service", "document");
        let err = RuleSet::order(Catalog::Service).validate(&sub).unwrap_err();
        assert_eq!(err.message(), "Order details are required");
    }

    #[test]
    fn email_syntax() {
        for ok in ["a@b.com", "first.last+tag@uni.ac.in", "x_y@mail-host.org"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in [
            "",
            "plain",
            "@b.com",
            "a@",
            "a@b",
            "a@b.c",
            "a b@c.com",
            "a@@b.com",
            "a@-b.com",
            "a@b..com",
            ".a@b.com",
            "a@b.c0m",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn submission_from_json_renders_scalars() {
        let sub = Submission::from_json(json!({
            "feedback": "Nice",
            "rating": 4,
            "isFemale": true,
            "name": null,
            "tags": ["a"]
        }))
        .unwrap();
        assert_eq!(sub.get("feedback"), Some("Nice"));
        assert_eq!(sub.get("rating"), Some("4"));
        assert_eq!(sub.get("isFemale"), Some("true"));
        assert_eq!(sub.get("name"), None);
        assert_eq!(sub.get("tags"), Some("[\"a\"]"));
    }

    #[test]
    fn submission_from_json_rejects_non_objects() {
        assert!(Submission::from_json(json!([1, 2])).is_err());
        assert!(Submission::from_json(json!("text")).is_err());
    }

    #[test]
    fn float_rating_from_json_is_rejected() {
        let sub = Submission::from_json(json!({"feedback": "x", "rating": 4.0})).unwrap();
        assert!(RuleSet::feedback().validate(&sub).is_err());
    }

    #[test]
    fn flag_parsing() {
        let sub = Submission::new()
            .with("a", "true")
            .with("b", "on")
            .with("c", "false")
            .with("d", "0")
            .with("e", " ");
        assert!(sub.flag("a"));
        assert!(sub.flag("b"));
        assert!(!sub.flag("c"));
        assert!(!sub.flag("d"));
        assert!(!sub.flag("e"));
        assert!(!sub.flag("missing"));
    }
}

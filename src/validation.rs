//! Field validation rules for feedback records.
//!
//! Pure rule evaluation over a candidate set of field values - no I/O. The
//! same rules run twice per write: once in the handlers for fast rejection,
//! and once more inside [`crate::store::FeedbackStore`] as the final guard,
//! so the collection never holds an invalid record. Both layers call into
//! this module, which keeps the two checks from drifting apart.
//!
//! Each validator normalizes its input first (trimming, and lower-casing for
//! email) and returns the normalized value on success; callers persist the
//! normalized form, never the raw input.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Minimum `name` length after trimming.
pub const NAME_MIN_LEN: usize = 2;
/// Maximum `name` length after trimming.
pub const NAME_MAX_LEN: usize = 100;
/// Minimum `message` length after trimming.
pub const MESSAGE_MIN_LEN: usize = 10;
/// Maximum `message` length after trimming.
pub const MESSAGE_MAX_LEN: usize = 1000;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$")
        .expect("BUG: email pattern is a valid regex")
});

/// A single rule violation: which field failed and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: String,
}

impl FieldViolation {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Candidate field values for a create or partial-update operation.
///
/// All three fields are required for create; any non-empty subset is
/// accepted for update.
#[derive(Debug, Clone, Default)]
pub struct FeedbackFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl FeedbackFields {
    /// True if no field was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.message.is_none()
    }

    /// Names of the fields a create payload is missing (absent or blank).
    pub fn missing_for_create(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.name) {
            missing.push("name");
        }
        if is_blank(&self.email) {
            missing.push("email");
        }
        if is_blank(&self.message) {
            missing.push("message");
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Normalized output of [`validate`]: every present field has passed its
/// rule and carries the trimmed (and for email, lower-cased) value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// Validate every supplied field, collecting all violations rather than
/// stopping at the first.
pub fn validate(fields: &FeedbackFields) -> Result<NormalizedFields, Vec<FieldViolation>> {
    let mut violations = Vec::new();
    let mut normalized = NormalizedFields::default();

    if let Some(name) = &fields.name {
        match check_name(name) {
            Ok(value) => normalized.name = Some(value),
            Err(violation) => violations.push(violation),
        }
    }
    if let Some(email) = &fields.email {
        match check_email(email) {
            Ok(value) => normalized.email = Some(value),
            Err(violation) => violations.push(violation),
        }
    }
    if let Some(message) = &fields.message {
        match check_message(message) {
            Ok(value) => normalized.message = Some(value),
            Err(violation) => violations.push(violation),
        }
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(violations)
    }
}

/// `name`: trimmed, length in [`NAME_MIN_LEN`]..=[`NAME_MAX_LEN`].
pub fn check_name(raw: &str) -> Result<String, FieldViolation> {
    let value = raw.trim();
    let len = value.chars().count();
    if len < NAME_MIN_LEN {
        return Err(FieldViolation::new(
            "name",
            format!("Name must be at least {NAME_MIN_LEN} characters long"),
        ));
    }
    if len > NAME_MAX_LEN {
        return Err(FieldViolation::new(
            "name",
            format!("Name cannot exceed {NAME_MAX_LEN} characters"),
        ));
    }
    Ok(value.to_string())
}

/// `email`: trimmed, lower-cased, matching the `local@domain.tld` pattern.
pub fn check_email(raw: &str) -> Result<String, FieldViolation> {
    let value = raw.trim().to_lowercase();
    if !EMAIL_PATTERN.is_match(&value) {
        return Err(FieldViolation::new(
            "email",
            "Please enter a valid email address",
        ));
    }
    Ok(value)
}

/// `message`: trimmed, length in [`MESSAGE_MIN_LEN`]..=[`MESSAGE_MAX_LEN`].
pub fn check_message(raw: &str) -> Result<String, FieldViolation> {
    let value = raw.trim();
    let len = value.chars().count();
    if len < MESSAGE_MIN_LEN {
        return Err(FieldViolation::new(
            "message",
            format!("Message must be at least {MESSAGE_MIN_LEN} characters long"),
        ));
    }
    if len > MESSAGE_MAX_LEN {
        return Err(FieldViolation::new(
            "message",
            format!("Message cannot exceed {MESSAGE_MAX_LEN} characters"),
        ));
    }
    Ok(value.to_string())
}

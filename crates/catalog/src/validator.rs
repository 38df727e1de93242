//! Field validation that collects every failure before reporting.

use std::{
    collections::{BTreeMap, HashSet},
    hash::Hash,
    sync::LazyLock,
};

use regex::Regex;

use crate::ApiError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid regex")
});

/// Accumulates one message per failing field.
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    /// Records `message` for `field` unless `ok`. The first failure of a field wins.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.to_string());
        }
    }

    /// Whether no check failed so far.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turns collected failures into a 422 error.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::FailedValidation(self.errors))
        }
    }
}

/// Whether every value appears once.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|value| seen.insert(value))
}

/// Whether `value` looks like an email address.
pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

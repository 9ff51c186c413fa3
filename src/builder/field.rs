//! Field validation helpers for `instantiate`.
//!
//! Prototype fields start unset (`None`). Each kind's `instantiate` uses a
//! [`Check`] to turn the partially specified prototype into a concrete entity
//! and reports what is missing or contradictory.

use crate::error::{GenError, Result};

/// Which of two mutually exclusive fields was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneOf<A, B> {
    First(A),
    Second(B),
}

/// Validation context for one prototype.
#[derive(Debug, Clone, Copy)]
pub struct Check<'a> {
    kind: &'static str,
    name: &'a str,
}

impl<'a> Check<'a> {
    pub fn new(kind: &'static str, name: &'a str) -> Self {
        Self { kind, name }
    }

    /// The field's value, or `MissingField`.
    pub fn require<'v, T>(&self, field: &'static str, value: &'v Option<T>) -> Result<&'v T> {
        value.as_ref().ok_or_else(|| self.missing(field))
    }

    /// Exactly one of the two fields must be set.
    pub fn require_one<'v, A, B>(
        &self,
        first: (&'static str, &'v Option<A>),
        second: (&'static str, &'v Option<B>),
    ) -> Result<OneOf<&'v A, &'v B>> {
        match (first.1, second.1) {
            (Some(a), None) => Ok(OneOf::First(a)),
            (None, Some(b)) => Ok(OneOf::Second(b)),
            _ => Err(GenError::AmbiguousField {
                kind: self.kind,
                name: self.name.to_string(),
                first: first.0,
                second: second.0,
            }),
        }
    }

    pub fn require_unset<T>(
        &self,
        field: &'static str,
        value: &Option<T>,
        reason: &str,
    ) -> Result<()> {
        match value {
            Some(_) => Err(GenError::ConflictingField {
                kind: self.kind,
                name: self.name.to_string(),
                field,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// If any field in `required` is set, all of them must be. Returns
    /// whether the group is present.
    pub fn check_group(&self, required: &[(&'static str, bool)]) -> Result<bool> {
        if !required.iter().any(|(_, set)| *set) {
            return Ok(false);
        }
        match required.iter().find(|(_, set)| !*set) {
            Some((field, _)) => Err(self.missing(field)),
            None => Ok(true),
        }
    }

    /// Two-field group: both set gives `Some`, neither gives `None`.
    pub fn pair<A: Clone, B: Clone>(
        &self,
        first: (&'static str, &Option<A>),
        second: (&'static str, &Option<B>),
    ) -> Result<Option<(A, B)>> {
        let present =
            self.check_group(&[(first.0, first.1.is_some()), (second.0, second.1.is_some())])?;
        Ok(match (present, first.1, second.1) {
            (true, Some(a), Some(b)) => Some((a.clone(), b.clone())),
            _ => None,
        })
    }

    /// `Invalid` error for this prototype.
    pub fn invalid(&self, message: impl Into<String>) -> GenError {
        GenError::Invalid {
            kind: self.kind,
            name: self.name.to_string(),
            message: message.into(),
        }
    }

    fn missing(&self, field: &'static str) -> GenError {
        GenError::MissingField {
            kind: self.kind,
            name: self.name.to_string(),
            field,
        }
    }
}

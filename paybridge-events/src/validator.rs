//! Structural envelope validation

use crate::envelope::EventEnvelope;
use crate::error::{EventError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use once_cell::sync::Lazy;
use regex::Regex;

static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]+\.[a-z]+(\.(created|updated|deleted|succeeded|failed))?$")
        .unwrap_or_else(|e| panic!("invalid event type pattern: {e}"))
});

static SOURCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/[a-z0-9_-]+(/[a-z0-9_-]+)+$")
        .unwrap_or_else(|e| panic!("invalid event source pattern: {e}"))
});

/// Checks the five structural envelope fields.
///
/// Fields are checked in the order id, type, source, specversion, time and
/// the first violation is returned.
#[derive(Debug)]
pub struct EnvelopeValidator {
    versions: DashSet<String>,
}

impl EnvelopeValidator {
    /// Validator accepting spec versions 1.0 and 1.1
    pub fn new() -> Self {
        Self::with_versions(["1.0", "1.1"])
    }

    pub fn with_versions<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = DashSet::new();
        for version in versions {
            set.insert(version.into());
        }
        Self { versions: set }
    }

    /// Accept another spec version
    pub fn add_version(&self, version: impl Into<String>) {
        self.versions.insert(version.into());
    }

    /// Whether envelopes of this spec version may be processed.
    ///
    /// Consumers skip envelopes for which this returns false.
    pub fn accepts_version(&self, version: &str) -> bool {
        self.versions.contains(version)
    }

    /// Registered versions, sorted
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.versions.iter().map(|v| v.key().clone()).collect();
        versions.sort();
        versions
    }

    pub fn validate(&self, envelope: &EventEnvelope) -> Result<()> {
        if envelope.id().is_empty() {
            return Err(EventError::schema("id", "event id is required"));
        }

        if envelope.event_type().is_empty() {
            return Err(EventError::schema("type", "event type is required"));
        }
        if !TYPE_PATTERN.is_match(envelope.event_type()) {
            return Err(EventError::schema(
                "type",
                format!("'{}' is not of the form domain.resource", envelope.event_type()),
            ));
        }

        if envelope.source().is_empty() {
            return Err(EventError::schema("source", "event source is required"));
        }
        if !SOURCE_PATTERN.is_match(envelope.source()) {
            return Err(EventError::schema(
                "source",
                format!("'{}' is not of the form /domain/resource", envelope.source()),
            ));
        }

        if envelope.specversion().is_empty() {
            return Err(EventError::schema("specversion", "event specversion is required"));
        }
        if !self.accepts_version(envelope.specversion()) {
            return Err(EventError::schema(
                "specversion",
                format!(
                    "unsupported specversion '{}', expected one of {}",
                    envelope.specversion(),
                    self.versions().join(", ")
                ),
            ));
        }

        match envelope.time() {
            None => Err(EventError::schema("time", "event time is required")),
            Some(t) if t == DateTime::<Utc>::default() => {
                Err(EventError::schema("time", "event time must be non-zero"))
            }
            Some(_) => Ok(()),
        }
    }
}

impl Default for EnvelopeValidator {
    fn default() -> Self {
        Self::new()
    }
}

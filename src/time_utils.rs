// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as an RFC3339 string, used for `*At` fields we write.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Long-form date, e.g. "January 5, 2026".
pub fn format_long_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// A timestamp as it appears in documents synced by the Stripe extension.
///
/// Depending on the client that read the document it may be a
/// `{seconds, nanoseconds}` map, an RFC3339 string, or bare unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FirestoreTime {
    Parts {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    Rfc3339(String),
    UnixSeconds(i64),
}

impl FirestoreTime {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FirestoreTime::Parts {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
            FirestoreTime::Rfc3339(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            FirestoreTime::UnixSeconds(seconds) => DateTime::from_timestamp(*seconds, 0),
        }
    }

    pub fn from_datetime(date: DateTime<Utc>) -> Self {
        FirestoreTime::Parts {
            seconds: date.timestamp(),
            nanoseconds: date.timestamp_subsec_nanos(),
        }
    }
}

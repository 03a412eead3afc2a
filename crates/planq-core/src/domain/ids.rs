//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type でラップして、EvalId と JobId を
//! コンパイル時に区別します。実行時のサイズは Ulid と同じです。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for each ID kind. Provides the `Display` prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed identifier.
///
/// `T` only exists at compile time, so an `EvalId` can never be passed where
/// a `JobId` is expected.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// Generate a fresh id stamped with the current wall-clock time.
    pub fn generate() -> Self {
        let timestamp_ms = chrono::Utc::now().timestamp_millis() as u64;
        Self::from_ulid(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Evaluation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Eval {}

impl IdMarker for Eval {
    fn prefix() -> &'static str {
        "eval-"
    }
}

/// Job marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn prefix() -> &'static str {
        "job-"
    }
}

/// Identifier of the evaluation a plan was computed for.
pub type EvalId = Id<Eval>;

/// Identifier of the job a plan places allocations for.
pub type JobId = Id<Job>;

//! Movie records and their validation rules.

use std::fmt;

use jiff::{Timestamp, Zoned};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::validator::{Validator, unique};

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    /// Unique id, assigned by the store.
    pub id: u64,
    /// When the record was created.
    pub created_at: Timestamp,
    /// Title.
    pub title: String,
    /// Release year.
    #[serde(skip_serializing_if = "is_zero")]
    pub year: u16,
    /// Length in minutes.
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    /// Genres, at most five.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    /// Starts at 1 and increases with every update.
    pub version: u32,
}

/// The fields a client provides when creating a movie.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewMovie {
    /// Title.
    pub title: String,
    /// Release year.
    pub year: u16,
    /// Length in minutes.
    pub runtime: Runtime,
    /// Genres.
    pub genres: Vec<String>,
}

/// A partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovieUpdate {
    /// New title.
    pub title: Option<String>,
    /// New release year.
    pub year: Option<u16>,
    /// New length.
    pub runtime: Option<Runtime>,
    /// New genres, replacing the old list.
    pub genres: Option<Vec<String>>,
}

impl Movie {
    /// Applies the fields present in `update`.
    pub fn apply(&mut self, update: MovieUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }

        if let Some(year) = update.year {
            self.year = year;
        }

        if let Some(runtime) = update.runtime {
            self.runtime = runtime;
        }

        if let Some(genres) = update.genres {
            self.genres = genres;
        }
    }
}

/// Checks a movie's fields, recording one message per invalid field.
pub fn validate(v: &mut Validator, title: &str, year: u16, runtime: Runtime, genres: &[String]) {
    v.check(!title.is_empty(), "title", "must be provided");
    v.check(title.len() <= 500, "title", "must not be more than 500 bytes long");

    v.check(year != 0, "year", "must be provided");
    v.check(year >= 1888, "year", "must be greater than 1888");
    v.check(i32::from(year) <= current_year(), "year", "must not be in the future");

    v.check(!runtime.is_zero(), "runtime", "must be provided");
    v.check(runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(!genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(genres.len() <= 5, "genres", "must not contain more than 5 genres");
    v.check(unique(genres), "genres", "must not contain duplicate values");
}

fn current_year() -> i32 {
    i32::from(Zoned::now().year())
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

/// A movie's length in minutes, written as `"<n> mins"` in JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

impl Runtime {
    /// Whether no runtime was given.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;

        value
            .strip_suffix(" mins")
            .and_then(|minutes| minutes.parse().ok())
            .map(Runtime)
            .ok_or_else(|| de::Error::custom("invalid runtime format"))
    }
}

#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

pub mod auth;
pub mod cli_opts;
pub mod config;
pub mod mail;
pub mod models;
pub mod pgpool;
pub mod planner;
pub mod schedule;
pub mod timezone;
pub mod week;

use time::OffsetDateTime;
use time_tz::{OffsetDateTimeExt, Tz};

use stack_string::StackString;

use crate::{config::Config, timezone::TimeZone};

/// Timestamp rendered in the configured timezone, falling back to the
/// system timezone.
#[must_use]
pub fn get_default_or_local_time(dt: OffsetDateTime, config: &Config) -> StackString {
    let tz: &Tz = config.default_time_zone.unwrap_or_else(TimeZone::local).into();
    StackString::from_display(dt.to_timezone(tz))
}

#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::default_trait_access)]

pub mod app;
pub mod elements;
pub mod errors;
pub mod routes;
pub mod session;

use serde::{Deserialize, Serialize};
use stack_string::StackString;
use time::{Date, macros::format_description};

use schedule_app_lib::models::{CalendarShare, Event, User};

use crate::session::LoggedUser;

#[must_use]
pub fn format_time_of_day(t: time::Time) -> StackString {
    t.format(format_description!("[hour]:[minute]"))
        .map_or_else(|_| "00:00".into(), Into::into)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedUserWrapper {
    pub id: uuid::Uuid,
    pub email: StackString,
    pub username: StackString,
    pub first_name: StackString,
    pub last_name: StackString,
    pub time_zone: Option<StackString>,
}

impl From<&User> for LoggedUserWrapper {
    fn from(item: &User) -> Self {
        Self {
            id: item.id,
            email: item.email.clone(),
            username: item.username.clone(),
            first_name: item.first_name.clone(),
            last_name: item.last_name.clone(),
            time_zone: item.time_zone.clone(),
        }
    }
}

impl From<&LoggedUser> for LoggedUserWrapper {
    fn from(item: &LoggedUser) -> Self {
        (&item.user).into()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventWrapper {
    pub id: uuid::Uuid,
    pub title: StackString,
    pub notes: Option<StackString>,
    pub start_time: StackString,
    pub end_time: StackString,
    pub color: StackString,
    pub event_date: Option<Date>,
    pub days: Vec<u8>,
}

impl EventWrapper {
    #[must_use]
    pub fn from_parts(event: Event, days: Vec<i16>) -> Self {
        Self {
            id: event.id,
            title: event.title,
            notes: event.notes,
            start_time: format_time_of_day(event.start_time),
            end_time: format_time_of_day(event.end_time),
            color: event.color,
            event_date: event.event_date,
            days: days
                .into_iter()
                .filter_map(|day| u8::try_from(day).ok())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShareWrapper {
    pub id: uuid::Uuid,
    pub counterparty_username: StackString,
    pub counterparty_email: StackString,
    pub status: StackString,
}

impl ShareWrapper {
    #[must_use]
    pub fn from_parts(share: &CalendarShare, counterparty: &User) -> Self {
        Self {
            id: share.id,
            counterparty_username: counterparty.username.clone(),
            counterparty_email: counterparty.email.clone(),
            status: share.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::time;

    use crate::format_time_of_day;

    #[test]
    fn test_format_time_of_day() {
        assert_eq!(format_time_of_day(time!(09:05)).as_str(), "09:05");
        assert_eq!(format_time_of_day(time!(23:59)).as_str(), "23:59");
    }
}

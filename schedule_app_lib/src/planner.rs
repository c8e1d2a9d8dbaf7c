use anyhow::Error;
use futures::future::try_join_all;
use log::{debug, error};
use smallvec::SmallVec;
use stack_string::{StackString, format_sstr};
use std::collections::HashMap;
use time::{Date, Duration, OffsetDateTime, Time, Weekday};
use time_tz::{OffsetDateTimeExt, Tz};
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::{
    auth::{
        generate_secure_code, hash_password, password_reused, validate_password,
        validate_username, verify_password,
    },
    config::Config,
    mail::send_reset_code,
    models::{
        CalendarShare, Event, PasswordHistory, RecurringDay, ResetCode, Session, ShareStatus,
        User, UserTheme,
    },
    pgpool::PgPool,
    schedule::{
        DisplayEvent, EventAnchor, EventColor, ScheduleEvent, find_conflict, materialize_week,
    },
    timezone::TimeZone,
    week::weekday_from_number,
};

pub const RESET_CODE_LENGTH: usize = 6;
const RESET_CODE_TTL_MINUTES: i64 = 15;
const MAX_TITLE_LENGTH: usize = 64;

/// Service wiring the stored schedule to the materialization and conflict
/// logic, scoped per request to a single user.
#[derive(Clone)]
pub struct WeekPlanner {
    pub config: Config,
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: StackString,
    pub notes: Option<StackString>,
    pub start: Time,
    pub end: Time,
    pub color: StackString,
    pub date: Option<Date>,
    pub days: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EventEdits {
    pub title: StackString,
    pub notes: Option<StackString>,
    pub color: StackString,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Event),
    Conflict(ScheduleEvent),
    Invalid(StackString),
}

#[derive(Debug)]
pub enum EditOutcome {
    Updated(Event),
    Invalid(StackString),
    NotFound,
}

#[derive(Debug)]
pub enum SignupOutcome {
    Created(User),
    Invalid(StackString),
}

#[derive(Debug)]
pub enum ResetOutcome {
    Updated,
    Invalid(StackString),
}

#[derive(Debug)]
pub enum ShareOutcome {
    Requested(CalendarShare),
    Invalid(StackString),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: StackString,
    pub last_name: StackString,
    pub username: StackString,
    pub email: StackString,
    pub password: StackString,
    pub theme: Option<StackString>,
}

fn validate_new_event(new: &NewEvent) -> Result<(EventColor, EventAnchor), StackString> {
    let title = new.title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LENGTH {
        return Err("Title must be between 1 and 64 characters".into());
    }
    if new.start >= new.end {
        return Err("Start time must be before end time".into());
    }
    let color = EventColor::new(&new.color)
        .map_err(|_| StackString::from("Color must be of the form #RRGGBB"))?;
    let anchor = match (new.date, new.days.is_empty()) {
        (Some(date), true) => EventAnchor::Date(date),
        (None, false) => {
            let mut days: SmallVec<[Weekday; 7]> = SmallVec::new();
            for number in &new.days {
                let day = weekday_from_number(*number)
                    .ok_or_else(|| StackString::from("Weekday must be between 0 and 6"))?;
                if !days.contains(&day) {
                    days.push(day);
                }
            }
            EventAnchor::Days(days)
        }
        (Some(_), false) => {
            return Err("Provide either a date or weekdays, not both".into());
        }
        (None, true) => {
            return Err("Provide a date or at least one weekday".into());
        }
    };
    Ok((color, anchor))
}

impl WeekPlanner {
    #[must_use]
    pub fn new(config: Config, pool: PgPool) -> Self {
        Self { config, pool }
    }

    fn resolve_timezone(&self, user: &User) -> TimeZone {
        user.time_zone
            .as_ref()
            .and_then(|tz| tz.as_str().parse().ok())
            .or(self.config.default_time_zone)
            .unwrap_or_else(TimeZone::local)
    }

    #[must_use]
    pub fn today_for_user(&self, user: &User) -> Date {
        let tz: &Tz = self.resolve_timezone(user).into();
        OffsetDateTime::now_utc().to_timezone(tz).date()
    }

    /// All of one user's stored events with their weekday sets attached.
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn user_events(&self, user_id: Uuid) -> Result<Vec<ScheduleEvent>, Error> {
        let events = Event::get_by_user(user_id, &self.pool).await?;
        let event_ids: Vec<Uuid> = events.iter().map(|event| event.id).collect();
        let mut day_map: HashMap<Uuid, SmallVec<[Weekday; 7]>> = HashMap::new();
        if !event_ids.is_empty() {
            for row in RecurringDay::get_by_event_ids(&event_ids, &self.pool).await? {
                let Some(day) = weekday_from_number(row.day_of_week.try_into().unwrap_or(u8::MAX))
                else {
                    debug!("recurring day {} outside 0..=6, ignoring", row.day_of_week);
                    continue;
                };
                day_map.entry(row.event_id).or_default().push(day);
            }
        }
        let events = events
            .into_iter()
            .map(|event| ScheduleEvent {
                id: event.id,
                title: event.title,
                notes: event.notes,
                start: event.start_time,
                end: event.end_time,
                color: EventColor::from_stored(&event.color),
                date: event.event_date,
                days: day_map.remove(&event.id).unwrap_or_default(),
            })
            .collect();
        Ok(events)
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn check_conflict(
        &self,
        user_id: Uuid,
        start: Time,
        end: Time,
        anchor: &EventAnchor,
    ) -> Result<Option<ScheduleEvent>, Error> {
        let existing = self.user_events(user_id).await?;
        Ok(find_conflict(&existing, start, end, anchor).cloned())
    }

    /// Validates, checks for conflicts, then stores the event and its
    /// weekday rows.
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn create_event(
        &self,
        user_id: Uuid,
        new: NewEvent,
    ) -> Result<CreateOutcome, Error> {
        let (color, anchor) = match validate_new_event(&new) {
            Ok(validated) => validated,
            Err(message) => return Ok(CreateOutcome::Invalid(message)),
        };
        if let Some(conflict) = self.check_conflict(user_id, new.start, new.end, &anchor).await? {
            return Ok(CreateOutcome::Conflict(conflict));
        }
        let now = OffsetDateTime::now_utc();
        let event = Event {
            id: Uuid::new_v4(),
            user_id,
            title: new.title.trim().into(),
            notes: new.notes,
            start_time: new.start,
            end_time: new.end,
            color: color.as_str().into(),
            event_date: match &anchor {
                EventAnchor::Date(date) => Some(*date),
                EventAnchor::Days(_) => None,
            },
            created_at: now,
            last_modified: now,
        };
        event.insert(&self.pool).await?;
        if let EventAnchor::Days(days) = &anchor {
            for day in days {
                let row = RecurringDay {
                    id: Uuid::new_v4(),
                    event_id: event.id,
                    day_of_week: i16::from(day.number_days_from_monday()),
                };
                row.insert(&self.pool).await?;
            }
        }
        Ok(CreateOutcome::Created(event))
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn edit_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        edits: EventEdits,
    ) -> Result<EditOutcome, Error> {
        let Some(mut event) = Event::get_by_id(event_id, &self.pool).await? else {
            return Ok(EditOutcome::NotFound);
        };
        if event.user_id != user_id {
            return Ok(EditOutcome::NotFound);
        }
        let title = edits.title.trim();
        if title.is_empty() || title.len() > MAX_TITLE_LENGTH {
            return Ok(EditOutcome::Invalid(
                "Title must be between 1 and 64 characters".into(),
            ));
        }
        if EventColor::new(&edits.color).is_err() {
            return Ok(EditOutcome::Invalid("Color must be of the form #RRGGBB".into()));
        }
        event.title = title.into();
        event.notes = edits.notes;
        event.color = edits.color;
        event.update(&self.pool).await?;
        Ok(EditOutcome::Updated(event))
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn delete_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, Error> {
        let Some(event) = Event::get_by_id(event_id, &self.pool).await? else {
            return Ok(false);
        };
        if event.user_id != user_id {
            return Ok(false);
        }
        event.delete(&self.pool).await?;
        Ok(true)
    }

    /// Renderable occurrences for the week containing `reference`
    /// (defaulting to today in the user's timezone).
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn week_display(
        &self,
        user: &User,
        reference: Option<Date>,
    ) -> Result<Vec<DisplayEvent>, Error> {
        let reference = reference.unwrap_or_else(|| self.today_for_user(user));
        let events = self.user_events(user.id).await?;
        Ok(materialize_week(&events, reference, self.config.week_start()))
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn create_user(&self, new: NewUser) -> Result<SignupOutcome, Error> {
        if let Err(e) = validate_username(&new.username) {
            return Ok(SignupOutcome::Invalid(format_sstr!("{e}")));
        }
        if new.first_name.trim().is_empty() || new.last_name.trim().is_empty() {
            return Ok(SignupOutcome::Invalid("First and last name are required".into()));
        }
        if !new.email.contains('@') {
            return Ok(SignupOutcome::Invalid("Invalid email address".into()));
        }
        if let Err(e) = validate_password(&new.password) {
            return Ok(SignupOutcome::Invalid(format_sstr!("{e}")));
        }
        let theme = new.theme.unwrap_or_else(|| "dark".into());
        if theme.as_str() != "light" && theme.as_str() != "dark" {
            return Ok(SignupOutcome::Invalid("Invalid theme".into()));
        }
        if User::get_by_username(&new.username, &self.pool).await?.is_some() {
            return Ok(SignupOutcome::Invalid("Username already taken".into()));
        }
        if User::get_by_email(&new.email, &self.pool).await?.is_some() {
            return Ok(SignupOutcome::Invalid(
                "Email already registered. Please log in".into(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            first_name: new.first_name.trim().into(),
            last_name: new.last_name.trim().into(),
            username: new.username,
            email: new.email.to_lowercase().into(),
            password: hash_password(&new.password)?,
            time_zone: None,
            created_at: now,
            updated_at: now,
        };
        user.insert(&self.pool).await?;
        let user_theme = UserTheme {
            id: Uuid::new_v4(),
            user_id: user.id,
            theme,
        };
        user_theme.upsert(&self.pool).await?;
        let history = PasswordHistory {
            id: Uuid::new_v4(),
            user_id: user.id,
            password: user.password.clone(),
            created_at: now,
        };
        history.insert(&self.pool).await?;
        Ok(SignupOutcome::Created(user))
    }

    /// Login check by username or email.
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<User>, Error> {
        let Some(user) = User::get_by_identifier(identifier, &self.pool).await? else {
            return Ok(None);
        };
        if verify_password(&user.password, password).unwrap_or(false) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Stores and emails a reset code. Responds identically whether or not
    /// the address belongs to an account.
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn request_password_reset(&self, email: &str) -> Result<(), Error> {
        let Some(user) = User::get_by_email(email, &self.pool).await? else {
            debug!("password reset requested for unknown address");
            return Ok(());
        };
        let now = OffsetDateTime::now_utc();
        let reset_code = ResetCode {
            id: Uuid::new_v4(),
            user_id: user.id,
            code: generate_secure_code(RESET_CODE_LENGTH),
            requested: now,
            expiration: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
            used: false,
        };
        reset_code.insert(&self.pool).await?;
        let config = self.config.clone();
        let recipient = user.email.clone();
        let code = reset_code.code.clone();
        if let Err(e) = spawn_blocking(move || send_reset_code(&config, &recipient, &code)).await? {
            error!("failed to send reset code: {e}");
        }
        Ok(())
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<ResetOutcome, Error> {
        let Some(user) = User::get_by_email(email, &self.pool).await? else {
            return Ok(ResetOutcome::Invalid("Invalid or expired code".into()));
        };
        let Some(reset_code) = ResetCode::get_unused(user.id, code, &self.pool).await? else {
            return Ok(ResetOutcome::Invalid("Invalid or expired code".into()));
        };
        if reset_code.is_expired() {
            return Ok(ResetOutcome::Invalid("Invalid or expired code".into()));
        }
        if let Err(e) = validate_password(new_password) {
            return Ok(ResetOutcome::Invalid(format_sstr!("{e}")));
        }
        if password_reused(user.id, new_password, &self.pool).await? {
            return Ok(ResetOutcome::Invalid(
                "New password must differ from recently used passwords".into(),
            ));
        }
        let mut user = user;
        user.password = hash_password(new_password)?;
        user.update_password(&self.pool).await?;
        let history = PasswordHistory {
            id: Uuid::new_v4(),
            user_id: user.id,
            password: user.password.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        history.insert(&self.pool).await?;
        reset_code.mark_used(&self.pool).await?;
        Session::delete_by_user(user.id, &self.pool).await?;
        Ok(ResetOutcome::Updated)
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn request_share(
        &self,
        owner: &User,
        recipient_email: &str,
    ) -> Result<ShareOutcome, Error> {
        let Some(recipient) = User::get_by_email(recipient_email, &self.pool).await? else {
            return Ok(ShareOutcome::Invalid("No account with that email".into()));
        };
        if recipient.id == owner.id {
            return Ok(ShareOutcome::Invalid(
                "Cannot share a calendar with yourself".into(),
            ));
        }
        if CalendarShare::get_by_owner_and_recipient(owner.id, recipient.id, &self.pool)
            .await?
            .is_some()
        {
            return Ok(ShareOutcome::Invalid("Share already requested".into()));
        }
        let now = OffsetDateTime::now_utc();
        let share = CalendarShare {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            recipient_id: recipient.id,
            status: ShareStatus::Pending.as_str().into(),
            created_at: now,
            updated_at: now,
        };
        share.insert(&self.pool).await?;
        Ok(ShareOutcome::Requested(share))
    }

    /// # Errors
    /// Returns error on database failure
    pub async fn respond_share(
        &self,
        recipient_id: Uuid,
        share_id: Uuid,
        accept: bool,
    ) -> Result<Option<CalendarShare>, Error> {
        let Some(mut share) = CalendarShare::get_by_id(share_id, &self.pool).await? else {
            return Ok(None);
        };
        if share.recipient_id != recipient_id {
            return Ok(None);
        }
        let status = if accept {
            ShareStatus::Accepted
        } else {
            ShareStatus::Declined
        };
        share.status = status.as_str().into();
        share.update_status(&self.pool).await?;
        Ok(Some(share))
    }

    /// Outgoing shares paired with their recipients and incoming shares
    /// paired with their owners.
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn list_shares(
        &self,
        user: &User,
    ) -> Result<(Vec<(CalendarShare, User)>, Vec<(CalendarShare, User)>), Error> {
        let outgoing_futures = CalendarShare::get_by_owner(user.id, &self.pool)
            .await?
            .into_iter()
            .map(|share| async move {
                let recipient = User::get_by_id(share.recipient_id, &self.pool).await?;
                Ok(recipient.map(|recipient| (share, recipient)))
            });
        let outgoing: Result<Vec<_>, Error> = try_join_all(outgoing_futures).await;

        let incoming_futures = CalendarShare::get_by_recipient(user.id, &self.pool)
            .await?
            .into_iter()
            .map(|share| async move {
                let owner = User::get_by_id(share.owner_id, &self.pool).await?;
                Ok(owner.map(|owner| (share, owner)))
            });
        let incoming: Result<Vec<_>, Error> = try_join_all(incoming_futures).await;

        Ok((
            outgoing?.into_iter().flatten().collect(),
            incoming?.into_iter().flatten().collect(),
        ))
    }

    /// Materialized week of another user's calendar, available to the
    /// recipient of an accepted share.
    ///
    /// # Errors
    /// Returns error on database failure
    pub async fn shared_week(
        &self,
        viewer: &User,
        share_id: Uuid,
        reference: Option<Date>,
    ) -> Result<Option<(User, Vec<DisplayEvent>)>, Error> {
        let Some(share) = CalendarShare::get_by_id(share_id, &self.pool).await? else {
            return Ok(None);
        };
        if share.recipient_id != viewer.id || share.share_status() != ShareStatus::Accepted {
            return Ok(None);
        }
        let Some(owner) = User::get_by_id(share.owner_id, &self.pool).await? else {
            return Ok(None);
        };
        let events = self.week_display(&owner, reference).await?;
        Ok(Some((owner, events)))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, time};

    use crate::{
        planner::{NewEvent, validate_new_event},
        schedule::EventAnchor,
    };

    fn base_event() -> NewEvent {
        NewEvent {
            title: "standup".into(),
            notes: None,
            start: time!(09:00),
            end: time!(10:00),
            color: "#0F52BA".into(),
            date: Some(date!(2023 - 11 - 15)),
            days: Vec::new(),
        }
    }

    #[test]
    fn test_validate_dated_event() {
        let (_, anchor) = validate_new_event(&base_event()).unwrap();
        assert_eq!(anchor, EventAnchor::Date(date!(2023 - 11 - 15)));
    }

    #[test]
    fn test_validate_rejects_inverted_times() {
        let mut event = base_event();
        event.start = time!(11:00);
        event.end = time!(10:00);
        assert!(validate_new_event(&event).is_err());
    }

    #[test]
    fn test_validate_rejects_equal_times() {
        let mut event = base_event();
        event.end = event.start;
        assert!(validate_new_event(&event).is_err());
    }

    #[test]
    fn test_validate_rejects_both_anchors() {
        let mut event = base_event();
        event.days = vec![2];
        assert!(validate_new_event(&event).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_anchor() {
        let mut event = base_event();
        event.date = None;
        assert!(validate_new_event(&event).is_err());
    }

    #[test]
    fn test_validate_rejects_weekday_out_of_range() {
        let mut event = base_event();
        event.date = None;
        event.days = vec![7];
        assert!(validate_new_event(&event).is_err());
    }

    #[test]
    fn test_validate_deduplicates_weekdays() {
        let mut event = base_event();
        event.date = None;
        event.days = vec![2, 2, 4];
        let (_, anchor) = validate_new_event(&event).unwrap();
        match anchor {
            EventAnchor::Days(days) => assert_eq!(days.len(), 2),
            EventAnchor::Date(_) => panic!("expected weekday anchor"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_color() {
        let mut event = base_event();
        event.color = "blue".into();
        assert!(validate_new_event(&event).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_title() {
        let mut event = base_event();
        event.title = "   ".into();
        assert!(validate_new_event(&event).is_err());
    }
}

use anyhow::{Error, format_err};
use postgres_query::{FromSqlRow, query};
use stack_string::StackString;
use std::fmt;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::pgpool::PgPool;

#[derive(FromSqlRow, Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub first_name: StackString,
    pub last_name: StackString,
    pub username: StackString,
    pub email: StackString,
    pub password: StackString,
    pub time_zone: Option<StackString>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub async fn get_all(pool: &PgPool) -> Result<Vec<Self>, Error> {
        let query = query!("SELECT * FROM users ORDER BY created_at");
        let conn = pool.get().await?;
        query.fetch(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!("SELECT * FROM users WHERE id = $id", id = id);
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!(
            "SELECT * FROM users WHERE email = lower($email)",
            email = email
        );
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_username(username: &str, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!(
            "SELECT * FROM users WHERE lower(username) = lower($username)",
            username = username
        );
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    /// Login lookup by username or email address.
    pub async fn get_by_identifier(identifier: &str, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!(
            "SELECT * FROM users WHERE username = $identifier OR email = lower($identifier)",
            identifier = identifier
        );
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO users (id, first_name, last_name, username, email, password, time_zone, \
             created_at, updated_at)
             VALUES ($id, $first_name, $last_name, $username, lower($email), $password, \
             $time_zone, $created_at, $updated_at)",
            id = self.id,
            first_name = self.first_name,
            last_name = self.last_name,
            username = self.username,
            email = self.email,
            password = self.password,
            time_zone = self.time_zone,
            created_at = self.created_at,
            updated_at = self.updated_at,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn update_password(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "UPDATE users SET password = $password, updated_at = now() WHERE id = $id",
            password = self.password,
            id = self.id,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct UserTheme {
    pub id: Uuid,
    pub user_id: Uuid,
    pub theme: StackString,
}

impl UserTheme {
    pub async fn get_by_user_id(user_id: Uuid, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!(
            "SELECT * FROM user_theme WHERE user_id = $user_id",
            user_id = user_id
        );
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn upsert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO user_theme (id, user_id, theme) VALUES ($id, $user_id, $theme)
             ON CONFLICT (user_id) DO UPDATE SET theme = EXCLUDED.theme",
            id = self.id,
            user_id = self.user_id,
            theme = self.theme,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct ResetCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: StackString,
    pub requested: OffsetDateTime,
    pub expiration: OffsetDateTime,
    pub used: bool,
}

impl ResetCode {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expiration
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO reset_codes (id, user_id, code, requested, expiration, used)
             VALUES ($id, $user_id, $code, $requested, $expiration, $used)",
            id = self.id,
            user_id = self.user_id,
            code = self.code,
            requested = self.requested,
            expiration = self.expiration,
            used = self.used,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    /// Most recent unused code matching `code` for the user.
    pub async fn get_unused(
        user_id: Uuid,
        code: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>, Error> {
        let query = query!(
            "SELECT * FROM reset_codes WHERE user_id = $user_id AND code = $code \
             AND used = false ORDER BY requested DESC LIMIT 1",
            user_id = user_id,
            code = code,
        );
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn mark_used(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!("UPDATE reset_codes SET used = true WHERE id = $id", id = self.id);
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct PasswordHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub password: StackString,
    pub created_at: OffsetDateTime,
}

impl PasswordHistory {
    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO password_history (id, user_id, password, created_at)
             VALUES ($id, $user_id, $password, $created_at)",
            id = self.id,
            user_id = self.user_id,
            password = self.password,
            created_at = self.created_at,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn get_recent(
        user_id: Uuid,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>, Error> {
        let query = query!(
            "SELECT * FROM password_history WHERE user_id = $user_id \
             ORDER BY created_at DESC LIMIT $limit",
            user_id = user_id,
            limit = limit,
        );
        let conn = pool.get().await?;
        query.fetch(&conn).await.map_err(Into::into)
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    pub async fn get_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!("SELECT * FROM sessions WHERE id = $id", id = id);
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO sessions (id, user_id, created_at, expires_at)
             VALUES ($id, $user_id, $created_at, $expires_at)",
            id = self.id,
            user_id = self.user_id,
            created_at = self.created_at,
            expires_at = self.expires_at,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!("DELETE FROM sessions WHERE id = $id", id = self.id);
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn delete_by_user(user_id: Uuid, pool: &PgPool) -> Result<(), Error> {
        let query = query!("DELETE FROM sessions WHERE user_id = $user_id", user_id = user_id);
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn delete_expired(pool: &PgPool) -> Result<u64, Error> {
        let query = query!("DELETE FROM sessions WHERE expires_at < now()");
        let conn = pool.get().await?;
        query.execute(&conn).await.map_err(Into::into)
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: StackString,
    pub notes: Option<StackString>,
    pub start_time: Time,
    pub end_time: Time,
    pub color: StackString,
    pub event_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub last_modified: OffsetDateTime,
}

impl Event {
    pub async fn get_by_user(user_id: Uuid, pool: &PgPool) -> Result<Vec<Self>, Error> {
        let query = query!(
            "SELECT * FROM events WHERE user_id = $user_id ORDER BY created_at",
            user_id = user_id
        );
        let conn = pool.get().await?;
        query.fetch(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!("SELECT * FROM events WHERE id = $id", id = id);
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO events (id, user_id, title, notes, start_time, end_time, color, \
             event_date, created_at, last_modified)
             VALUES ($id, $user_id, $title, $notes, $start_time, $end_time, $color, \
             $event_date, $created_at, $last_modified)",
            id = self.id,
            user_id = self.user_id,
            title = self.title,
            notes = self.notes,
            start_time = self.start_time,
            end_time = self.end_time,
            color = self.color,
            event_date = self.event_date,
            created_at = self.created_at,
            last_modified = self.last_modified,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    /// Edits never touch times, date or recurrence, only the presentation
    /// fields.
    pub async fn update(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "UPDATE events SET title = $title, notes = $notes, color = $color, \
             last_modified = now() WHERE id = $id",
            title = self.title,
            notes = self.notes,
            color = self.color,
            id = self.id,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!("DELETE FROM events WHERE id = $id", id = self.id);
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct RecurringDay {
    pub id: Uuid,
    pub event_id: Uuid,
    pub day_of_week: i16,
}

impl RecurringDay {
    pub async fn get_by_event_ids(
        event_ids: &[Uuid],
        pool: &PgPool,
    ) -> Result<Vec<Self>, Error> {
        let event_ids = event_ids.to_vec();
        let query = query!(
            "SELECT * FROM recurring_days WHERE event_id = ANY($event_ids) \
             ORDER BY event_id, day_of_week",
            event_ids = event_ids
        );
        let conn = pool.get().await?;
        query.fetch(&conn).await.map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO recurring_days (id, event_id, day_of_week)
             VALUES ($id, $event_id, $day_of_week)",
            id = self.id,
            event_id = self.event_id,
            day_of_week = self.day_of_week,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareStatus {
    Pending,
    Accepted,
    Declined,
}

impl ShareStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShareStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            _ => Err(format_err!("{s} is not a share status")),
        }
    }
}

#[derive(FromSqlRow, Clone, Debug)]
pub struct CalendarShare {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recipient_id: Uuid,
    pub status: StackString,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CalendarShare {
    #[must_use]
    pub fn share_status(&self) -> ShareStatus {
        self.status.as_str().parse().unwrap_or(ShareStatus::Pending)
    }

    pub async fn get_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>, Error> {
        let query = query!("SELECT * FROM calendar_shares WHERE id = $id", id = id);
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_owner(owner_id: Uuid, pool: &PgPool) -> Result<Vec<Self>, Error> {
        let query = query!(
            "SELECT * FROM calendar_shares WHERE owner_id = $owner_id ORDER BY created_at",
            owner_id = owner_id
        );
        let conn = pool.get().await?;
        query.fetch(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_recipient(recipient_id: Uuid, pool: &PgPool) -> Result<Vec<Self>, Error> {
        let query = query!(
            "SELECT * FROM calendar_shares WHERE recipient_id = $recipient_id ORDER BY created_at",
            recipient_id = recipient_id
        );
        let conn = pool.get().await?;
        query.fetch(&conn).await.map_err(Into::into)
    }

    pub async fn get_by_owner_and_recipient(
        owner_id: Uuid,
        recipient_id: Uuid,
        pool: &PgPool,
    ) -> Result<Option<Self>, Error> {
        let query = query!(
            "SELECT * FROM calendar_shares WHERE owner_id = $owner_id \
             AND recipient_id = $recipient_id",
            owner_id = owner_id,
            recipient_id = recipient_id,
        );
        let conn = pool.get().await?;
        query.fetch_opt(&conn).await.map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "INSERT INTO calendar_shares (id, owner_id, recipient_id, status, created_at, \
             updated_at)
             VALUES ($id, $owner_id, $recipient_id, $status, $created_at, $updated_at)",
            id = self.id,
            owner_id = self.owner_id,
            recipient_id = self.recipient_id,
            status = self.status,
            created_at = self.created_at,
            updated_at = self.updated_at,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }

    pub async fn update_status(&self, pool: &PgPool) -> Result<(), Error> {
        let query = query!(
            "UPDATE calendar_shares SET status = $status, updated_at = now() WHERE id = $id",
            status = self.status,
            id = self.id,
        );
        let conn = pool.get().await?;
        query.execute(&conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::ShareStatus;

    #[test]
    fn test_share_status_round_trip() {
        for status in [
            ShareStatus::Pending,
            ShareStatus::Accepted,
            ShareStatus::Declined,
        ] {
            let parsed: ShareStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("unknown".parse::<ShareStatus>().is_err());
    }
}

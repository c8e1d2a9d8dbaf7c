use axum::{
    Form,
    extract::{Json, Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use itertools::Itertools;
use serde::Deserialize;
use stack_string::{StackString, format_sstr};
use std::collections::HashMap;
use time::{Date, Time, macros::format_description};
use uuid::Uuid;

use schedule_app_lib::{
    models::{Event, RecurringDay, User, UserTheme},
    planner::{
        CreateOutcome, EditOutcome, EventEdits, NewEvent, NewUser, ResetOutcome, ShareOutcome,
        SignupOutcome,
    },
    week::week_window,
};

use crate::{
    EventWrapper, LoggedUserWrapper, ShareWrapper,
    app::AppState,
    elements::{
        build_event_body, event_list_body, index_body, login_body, shares_body, week_body,
    },
    errors::ServiceError as Error,
    session::{LoggedUser, SESSION_COOKIE, begin_session, end_session},
};

pub type HttpResult<T> = Result<T, Error>;

fn parse_date_field(value: &str) -> HttpResult<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::BadRequest(format_sstr!("{value} is not a valid date")))
}

fn parse_time_field(value: &str) -> HttpResult<Time> {
    Time::parse(value, format_description!("[hour]:[minute]"))
        .map_err(|_| Error::BadRequest(format_sstr!("{value} is not a valid time")))
}

pub async fn schedule_index(
    user: LoggedUser,
    State(data): State<AppState>,
) -> HttpResult<Html<String>> {
    let theme = UserTheme::get_by_user_id(user.user.id, &data.planner.pool)
        .await?
        .map_or_else(|| "dark".into(), |row| row.theme);
    let body = index_body((&user).into(), theme)?;
    Ok(Html(body))
}

pub async fn login_page() -> HttpResult<Html<String>> {
    Ok(Html(login_body()?))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: StackString,
    pub password: StackString,
}

pub async fn login(
    State(data): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<LoginRequest>,
) -> HttpResult<(CookieJar, Redirect)> {
    let Some(user) = data
        .planner
        .authenticate(payload.identifier.trim(), &payload.password)
        .await?
    else {
        return Err(Error::BadRequest("Invalid credentials".into()));
    };
    let cookie = begin_session(&user, &data.planner.pool).await?;
    Ok((jar.add(cookie), Redirect::to("/schedule/index.html")))
}

pub async fn logout(
    user: LoggedUser,
    State(data): State<AppState>,
    jar: CookieJar,
) -> HttpResult<(CookieJar, Redirect)> {
    end_session(user.session_id, &data.planner.pool).await?;
    Ok((
        jar.remove(Cookie::from(SESSION_COOKIE)),
        Redirect::to("/schedule/login"),
    ))
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub first_name: StackString,
    pub last_name: StackString,
    pub username: StackString,
    pub email: StackString,
    pub password: StackString,
    pub confirm_password: StackString,
}

pub async fn signup(
    State(data): State<AppState>,
    Form(payload): Form<SignupRequest>,
) -> HttpResult<Redirect> {
    if payload.password != payload.confirm_password {
        return Err(Error::BadRequest("Passwords must match".into()));
    }
    let new_user = NewUser {
        first_name: payload.first_name,
        last_name: payload.last_name,
        username: payload.username,
        email: payload.email,
        password: payload.password,
        theme: None,
    };
    match data.planner.create_user(new_user).await? {
        SignupOutcome::Created(_) => Ok(Redirect::to("/schedule/login")),
        SignupOutcome::Invalid(message) => Err(Error::BadRequest(message)),
    }
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: StackString,
}

pub async fn password_reset_request(
    State(data): State<AppState>,
    Form(payload): Form<ResetRequest>,
) -> HttpResult<Html<&'static str>> {
    data.planner.request_password_reset(&payload.email).await?;
    Ok(Html(
        "If the address is registered, a reset code has been sent.",
    ))
}

#[derive(Deserialize)]
pub struct ResetConfirmRequest {
    pub email: StackString,
    pub code: StackString,
    pub password: StackString,
    pub confirm_password: StackString,
}

pub async fn password_reset_confirm(
    State(data): State<AppState>,
    Form(payload): Form<ResetConfirmRequest>,
) -> HttpResult<Html<&'static str>> {
    if payload.password != payload.confirm_password {
        return Err(Error::BadRequest("Passwords must match".into()));
    }
    let outcome = data
        .planner
        .confirm_password_reset(&payload.email, payload.code.trim(), &payload.password)
        .await?;
    match outcome {
        ResetOutcome::Updated => Ok(Html("Password updated, please log in.")),
        ResetOutcome::Invalid(message) => Err(Error::BadRequest(message)),
    }
}

#[derive(Deserialize)]
pub struct WeekQuery {
    pub date: Option<StackString>,
}

pub async fn week_view(
    user: LoggedUser,
    State(data): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> HttpResult<Html<String>> {
    let body = get_week_view(&user.user, &query, &data).await?;
    Ok(Html(body))
}

async fn get_week_view(user: &User, query: &WeekQuery, data: &AppState) -> HttpResult<String> {
    let reference = match query.date.as_ref().filter(|date| !date.is_empty()) {
        Some(date) => Some(parse_date_field(date)?),
        None => None,
    };
    let events = data.planner.week_display(user, reference).await?;
    let reference = reference.unwrap_or_else(|| data.planner.today_for_user(user));
    let (window_start, _) = week_window(reference, data.planner.config.week_start());
    let title = format_sstr!("{}'s Schedule", user.first_name);
    let body = week_body(title, window_start, events)?;
    Ok(body)
}

pub async fn shared_week_view(
    user: LoggedUser,
    State(data): State<AppState>,
    Path(share_id): Path<Uuid>,
    Query(query): Query<WeekQuery>,
) -> HttpResult<Html<String>> {
    let reference = match query.date.as_ref().filter(|date| !date.is_empty()) {
        Some(date) => Some(parse_date_field(date)?),
        None => None,
    };
    let Some((owner, events)) = data
        .planner
        .shared_week(&user.user, share_id, reference)
        .await?
    else {
        return Err(Error::BadRequest("No such share".into()));
    };
    let reference = reference.unwrap_or_else(|| data.planner.today_for_user(&owner));
    let (window_start, _) = week_window(reference, data.planner.config.week_start());
    let title = format_sstr!("{}'s Schedule (shared)", owner.first_name);
    let body = week_body(title, window_start, events)?;
    Ok(Html(body))
}

pub async fn list_events(
    user: LoggedUser,
    State(data): State<AppState>,
) -> HttpResult<Html<String>> {
    let body = get_events_list(user.user.id, &data).await?;
    Ok(Html(body))
}

async fn get_events_list(user_id: Uuid, data: &AppState) -> HttpResult<String> {
    let events = Event::get_by_user(user_id, &data.planner.pool).await?;
    let event_ids: Vec<Uuid> = events.iter().map(|event| event.id).collect();
    let mut day_map: HashMap<Uuid, Vec<i16>> = if event_ids.is_empty() {
        HashMap::new()
    } else {
        RecurringDay::get_by_event_ids(&event_ids, &data.planner.pool)
            .await?
            .into_iter()
            .map(|row| (row.event_id, row.day_of_week))
            .into_group_map()
    };
    let wrappers = events
        .into_iter()
        .map(|event| {
            let days = day_map.remove(&event.id).unwrap_or_default();
            EventWrapper::from_parts(event, days)
        })
        .collect();
    let body = event_list_body(wrappers)?;
    Ok(body)
}

pub async fn build_event(_: LoggedUser) -> HttpResult<Html<String>> {
    Ok(Html(build_event_body()?))
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: StackString,
    pub notes: Option<StackString>,
    pub start_time: StackString,
    pub end_time: StackString,
    pub color: StackString,
    pub event_date: Option<StackString>,
    #[serde(default)]
    pub days: Vec<u8>,
}

pub async fn create_event(
    user: LoggedUser,
    State(data): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> HttpResult<Html<&'static str>> {
    let date = match payload.event_date.as_ref().filter(|date| !date.is_empty()) {
        Some(date) => Some(parse_date_field(date)?),
        None => None,
    };
    let new_event = NewEvent {
        title: payload.title,
        notes: payload.notes.filter(|notes| !notes.trim().is_empty()),
        start: parse_time_field(&payload.start_time)?,
        end: parse_time_field(&payload.end_time)?,
        color: payload.color,
        date,
        days: payload.days,
    };
    match data.planner.create_event(user.user.id, new_event).await? {
        CreateOutcome::Created(_) => Ok(Html("Event Inserted")),
        CreateOutcome::Conflict(existing) => Err(Error::BadRequest(format_sstr!(
            "Conflicts with existing event {}",
            existing.title
        ))),
        CreateOutcome::Invalid(message) => Err(Error::BadRequest(message)),
    }
}

#[derive(Deserialize)]
pub struct EditEventRequest {
    pub title: StackString,
    pub notes: Option<StackString>,
    pub color: StackString,
}

pub async fn edit_event(
    user: LoggedUser,
    State(data): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EditEventRequest>,
) -> HttpResult<Html<&'static str>> {
    let edits = EventEdits {
        title: payload.title,
        notes: payload.notes.filter(|notes| !notes.trim().is_empty()),
        color: payload.color,
    };
    match data.planner.edit_event(user.user.id, event_id, edits).await? {
        EditOutcome::Updated(_) => Ok(Html("Event Updated")),
        EditOutcome::Invalid(message) => Err(Error::BadRequest(message)),
        EditOutcome::NotFound => Err(Error::BadRequest("No such event".into())),
    }
}

#[derive(Deserialize)]
pub struct DeleteEventRequest {
    pub event_id: Uuid,
}

pub async fn delete_event(
    user: LoggedUser,
    State(data): State<AppState>,
    Json(payload): Json<DeleteEventRequest>,
) -> HttpResult<Html<&'static str>> {
    let body = if data
        .planner
        .delete_event(user.user.id, payload.event_id)
        .await?
    {
        "Event Deleted"
    } else {
        "Event not deleted"
    };
    Ok(Html(body))
}

pub async fn list_shares(
    user: LoggedUser,
    State(data): State<AppState>,
) -> HttpResult<Html<String>> {
    let (outgoing, incoming) = data.planner.list_shares(&user.user).await?;
    let outgoing = outgoing
        .iter()
        .map(|(share, recipient)| ShareWrapper::from_parts(share, recipient))
        .collect();
    let incoming = incoming
        .iter()
        .map(|(share, owner)| ShareWrapper::from_parts(share, owner))
        .collect();
    let body = shares_body(outgoing, incoming)?;
    Ok(Html(body))
}

#[derive(Deserialize)]
pub struct ShareCreateRequest {
    pub email: StackString,
}

pub async fn create_share(
    user: LoggedUser,
    State(data): State<AppState>,
    Json(payload): Json<ShareCreateRequest>,
) -> HttpResult<Html<&'static str>> {
    match data.planner.request_share(&user.user, &payload.email).await? {
        ShareOutcome::Requested(_) => Ok(Html("Share Requested")),
        ShareOutcome::Invalid(message) => Err(Error::BadRequest(message)),
    }
}

#[derive(Deserialize)]
pub struct ShareRespondRequest {
    pub share_id: Uuid,
    pub accept: bool,
}

pub async fn respond_share(
    user: LoggedUser,
    State(data): State<AppState>,
    Json(payload): Json<ShareRespondRequest>,
) -> HttpResult<Html<&'static str>> {
    let updated = data
        .planner
        .respond_share(user.user.id, payload.share_id, payload.accept)
        .await?;
    if updated.is_some() {
        Ok(Html("Share Updated"))
    } else {
        Err(Error::BadRequest("No such share".into()))
    }
}

#[derive(Deserialize)]
pub struct ThemeUpdateRequest {
    pub theme: StackString,
}

pub async fn update_theme(
    user: LoggedUser,
    State(data): State<AppState>,
    Json(payload): Json<ThemeUpdateRequest>,
) -> HttpResult<Html<&'static str>> {
    if payload.theme.as_str() != "light" && payload.theme.as_str() != "dark" {
        return Err(Error::BadRequest("Invalid theme".into()));
    }
    let user_theme = UserTheme {
        id: Uuid::new_v4(),
        user_id: user.user.id,
        theme: payload.theme,
    };
    user_theme.upsert(&data.planner.pool).await?;
    Ok(Html("Theme Updated"))
}

pub async fn user(user: LoggedUser) -> HttpResult<Json<LoggedUserWrapper>> {
    Ok(Json((&user).into()))
}

use dioxus::prelude::{
    Element, GlobalSignal, IntoDynNode, Props, Readable, VirtualDom, component, dioxus_elements,
    rsx,
};
use stack_string::{StackString, format_sstr};
use time::{Date, Duration};

use schedule_app_lib::schedule::{DisplayAnchor, DisplayEvent};

use crate::{EventWrapper, LoggedUserWrapper, ShareWrapper, errors::ServiceError as Error};

/// Half-hour time-of-day choices for the event form; the end dropdown gets
/// a terminal 23:59 entry so an event can run to the end of the day.
#[must_use]
pub fn generate_time_choices(end_field: bool) -> Vec<StackString> {
    let mut choices: Vec<StackString> = Vec::new();
    for hour in 0..24 {
        for minute in [0, 30] {
            choices.push(format_sstr!("{hour:02}:{minute:02}"));
        }
    }
    if end_field {
        choices.push("23:59".into());
    }
    choices
}

/// # Errors
/// Returns error if formatting fails
pub fn index_body(user: LoggedUserWrapper, theme: StackString) -> Result<String, Error> {
    let mut app = VirtualDom::new_with_props(IndexElement, IndexElementProps { user, theme });
    app.rebuild_in_place();
    let mut renderer = dioxus_ssr::Renderer::default();
    let mut buffer = String::new();
    renderer
        .render_to(&mut buffer, &app)
        .map_err(Into::<Error>::into)?;
    Ok(buffer)
}

#[component]
fn IndexElement(user: LoggedUserWrapper, theme: StackString) -> Element {
    let first_name = &user.first_name;
    rsx! {
        head {
            style {dangerous_inner_html: include_str!("../../templates/style.css")},
        },
        body {
            class: "theme-{theme}",
            h2 {"{first_name}'s Schedule"},
            br {
                input {
                    "type": "button",
                    name: "display_week",
                    value: "Week",
                    "onclick": "displayWeek();",
                },
                input {
                    "type": "button",
                    name: "list_events",
                    value: "Events",
                    "onclick": "listEvents();",
                },
                input {
                    "type": "button",
                    name: "build_event",
                    value: "New Event",
                    "onclick": "buildEvent();",
                },
                input {
                    "type": "button",
                    name: "list_shares",
                    value: "Shares",
                    "onclick": "listShares();",
                },
                input {
                    "type": "button",
                    name: "toggle_theme",
                    value: "Theme",
                    "onclick": "toggleTheme();",
                },
                input {
                    "type": "button",
                    name: "logout",
                    value: "Logout",
                    "onclick": "window.location.assign('/schedule/logout');",
                },
            }
            article {
                id: "main_article",
                "&nbsp;",
            },
            article {
                id: "sub_article",
                "&nbsp;",
            }
            script {
                "language": "JavaScript",
                "type": "text/javascript",
                dangerous_inner_html: include_str!("../../templates/scripts.js"),
            }
        }
    }
}

/// # Errors
/// Returns error if formatting fails
pub fn login_body() -> Result<String, Error> {
    let mut app = VirtualDom::new(LoginElement);
    app.rebuild_in_place();
    let mut renderer = dioxus_ssr::Renderer::default();
    let mut buffer = String::new();
    renderer
        .render_to(&mut buffer, &app)
        .map_err(Into::<Error>::into)?;
    Ok(buffer)
}

#[component]
fn LoginElement() -> Element {
    rsx! {
        head {
            style {dangerous_inner_html: include_str!("../../templates/style.css")},
        },
        body {
            h2 {"Log In"},
            form {
                action: "/schedule/login",
                method: "post",
                input {"type": "text", name: "identifier", placeholder: "Username or Email"},
                input {"type": "password", name: "password", placeholder: "Password"},
                input {"type": "submit", value: "Log In"},
            },
            h2 {"Sign Up"},
            form {
                action: "/schedule/signup",
                method: "post",
                input {"type": "text", name: "first_name", placeholder: "First Name"},
                input {"type": "text", name: "last_name", placeholder: "Last Name"},
                input {"type": "text", name: "username", placeholder: "Username"},
                input {"type": "email", name: "email", placeholder: "Email"},
                input {"type": "password", name: "password", placeholder: "Password"},
                input {"type": "password", name: "confirm_password", placeholder: "Confirm Password"},
                input {"type": "submit", value: "Sign Up"},
            },
            h2 {"Forgot Password"},
            form {
                action: "/schedule/password-reset/request",
                method: "post",
                input {"type": "email", name: "email", placeholder: "Email"},
                input {"type": "submit", value: "Send Reset Code"},
            },
            form {
                action: "/schedule/password-reset/confirm",
                method: "post",
                input {"type": "email", name: "email", placeholder: "Email"},
                input {"type": "text", name: "code", placeholder: "Reset Code"},
                input {"type": "password", name: "password", placeholder: "New Password"},
                input {"type": "password", name: "confirm_password", placeholder: "Confirm Password"},
                input {"type": "submit", value: "Reset Password"},
            },
        }
    }
}

/// # Errors
/// Returns error if formatting fails
pub fn week_body(
    title: StackString,
    window_start: Date,
    events: Vec<DisplayEvent>,
) -> Result<String, Error> {
    let mut app = VirtualDom::new_with_props(
        WeekElement,
        WeekElementProps {
            title,
            window_start,
            events,
        },
    );
    app.rebuild_in_place();
    let mut renderer = dioxus_ssr::Renderer::default();
    let mut buffer = String::new();
    renderer
        .render_to(&mut buffer, &app)
        .map_err(Into::<Error>::into)?;
    Ok(buffer)
}

#[component]
fn WeekElement(title: StackString, window_start: Date, events: Vec<DisplayEvent>) -> Element {
    let days: Vec<(Date, Vec<&DisplayEvent>)> = (0..7)
        .map(|offset| {
            let day = window_start + Duration::days(offset);
            let entries = events
                .iter()
                .filter(|event| match event.anchor {
                    DisplayAnchor::Date(date) => date == day,
                    DisplayAnchor::Weekday(weekday) => weekday == day.weekday(),
                })
                .collect();
            (day, entries)
        })
        .collect();
    rsx! {
        h3 {"{title}"},
        table {
            "border": "1",
            class: "dataframe week-grid",
            thead {
                tr {
                    {days.iter().map(|(day, _)| {
                        let weekday = day.weekday();
                        rsx! {
                            th {
                                key: "day-header-{day}",
                                "{weekday} {day}",
                            }
                        }
                    })}
                }
            },
            tbody {
                tr {
                    {days.iter().map(|(day, entries)| {
                        rsx! {
                            td {
                                key: "day-column-{day}",
                                {entries.iter().enumerate().map(|(idx, event)| {
                                    let border = event.border;
                                    let fill = event.fill;
                                    let label = &event.label;
                                    let notes = event.notes.as_ref().map_or("", StackString::as_str);
                                    rsx! {
                                        div {
                                            key: "event-{day}-{idx}",
                                            class: "week-event",
                                            style: "border: 2px solid {border}; background: {fill};",
                                            "{label}",
                                            div {
                                                class: "week-event-notes",
                                                "{notes}",
                                            }
                                        }
                                    }
                                })}
                            }
                        }
                    })}
                }
            }
        }
    }
}

/// # Errors
/// Returns error if formatting fails
pub fn build_event_body() -> Result<String, Error> {
    let mut app = VirtualDom::new(BuildEventElement);
    app.rebuild_in_place();
    let mut renderer = dioxus_ssr::Renderer::default();
    let mut buffer = String::new();
    renderer
        .render_to(&mut buffer, &app)
        .map_err(Into::<Error>::into)?;
    Ok(buffer)
}

#[component]
fn BuildEventElement() -> Element {
    let weekday_names = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];
    let start_choices = generate_time_choices(false);
    let end_choices = generate_time_choices(true);
    rsx! {
        form {
            action: "javascript:createScheduleEvent();",
            table {
                "border": "1",
                tbody {
                    tr {
                        td {"Title:"},
                        td {
                            input {
                                "type": "text",
                                name: "title",
                                id: "title",
                            }
                        }
                    },
                    tr {
                        td {"Notes:"},
                        td {
                            textarea {
                                cols: "40",
                                rows: "5",
                                name: "notes",
                                id: "notes",
                            }
                        }
                    },
                    tr {
                        td {"Date:"},
                        td {
                            input {
                                "type": "date",
                                name: "event_date",
                                id: "event_date",
                            },
                            " (leave empty for a weekly event)",
                        }
                    },
                    tr {
                        td {"Weekdays:"},
                        td {
                            {weekday_names.iter().enumerate().map(|(idx, name)| {
                                rsx! {
                                    label {
                                        key: "weekday-{idx}",
                                        input {
                                            "type": "checkbox",
                                            name: "days",
                                            class: "weekday-box",
                                            value: "{idx}",
                                        },
                                        "{name}",
                                    }
                                }
                            })}
                        }
                    },
                    tr {
                        td {"Start Time:"},
                        td {
                            select {
                                name: "start_time",
                                id: "start_time",
                                {start_choices.iter().map(|choice| {
                                    rsx! {
                                        option {
                                            key: "start-{choice}",
                                            value: "{choice}",
                                            "{choice}",
                                        }
                                    }
                                })}
                            }
                        }
                    },
                    tr {
                        td {"End Time:"},
                        td {
                            select {
                                name: "end_time",
                                id: "end_time",
                                {end_choices.iter().map(|choice| {
                                    rsx! {
                                        option {
                                            key: "end-{choice}",
                                            value: "{choice}",
                                            "{choice}",
                                        }
                                    }
                                })}
                            }
                        }
                    },
                    tr {
                        td {"Color:"},
                        td {
                            input {
                                "type": "color",
                                name: "color",
                                id: "color",
                                value: "#0F52BA",
                            }
                        }
                    },
                    tr {
                        td {
                            input {
                                "type": "button",
                                name: "create_event",
                                value: "Create Event",
                                "onclick": "createScheduleEvent();",
                            }
                        }
                    }
                }
            }
        }
    }
}

/// # Errors
/// Returns error if formatting fails
pub fn event_list_body(events: Vec<EventWrapper>) -> Result<String, Error> {
    let mut app = VirtualDom::new_with_props(ListEventsElement, ListEventsElementProps { events });
    app.rebuild_in_place();
    let mut renderer = dioxus_ssr::Renderer::default();
    let mut buffer = String::new();
    renderer
        .render_to(&mut buffer, &app)
        .map_err(Into::<Error>::into)?;
    Ok(buffer)
}

#[component]
fn ListEventsElement(events: Vec<EventWrapper>) -> Element {
    rsx! {
        table {
            "border": "1",
            class: "dataframe",
            thead {
                th {"Event"},
                th {"When"},
                th {"Start"},
                th {"End"},
                th {},
            },
            tbody {
                {events.iter().enumerate().map(|(idx, event)| {
                    let when = event.event_date.map_or_else(
                        || {
                            let days = event
                                .days
                                .iter()
                                .map(|day| weekday_abbrev(*day))
                                .collect::<Vec<_>>()
                                .join(" ");
                            format_sstr!("every {days}")
                        },
                        StackString::from_display,
                    );
                    let event_id = event.id;
                    let title = &event.title;
                    let start_time = &event.start_time;
                    let end_time = &event.end_time;
                    rsx! {
                        tr {
                            key: "event-key-{idx}",
                            "text-style": "center",
                            td {"{title}"},
                            td {"{when}"},
                            td {"{start_time}"},
                            td {"{end_time}"},
                            td {
                                input {
                                    "type": "button",
                                    name: "delete_event",
                                    value: "Delete",
                                    "onclick": "deleteScheduleEvent('{event_id}')",
                                }
                            },
                        }
                    }
                })}
            }
        }
    }
}

fn weekday_abbrev(day: u8) -> &'static str {
    match day {
        0 => "Mon",
        1 => "Tue",
        2 => "Wed",
        3 => "Thu",
        4 => "Fri",
        5 => "Sat",
        6 => "Sun",
        _ => "?",
    }
}

/// # Errors
/// Returns error if formatting fails
pub fn shares_body(
    outgoing: Vec<ShareWrapper>,
    incoming: Vec<ShareWrapper>,
) -> Result<String, Error> {
    let mut app =
        VirtualDom::new_with_props(SharesElement, SharesElementProps { outgoing, incoming });
    app.rebuild_in_place();
    let mut renderer = dioxus_ssr::Renderer::default();
    let mut buffer = String::new();
    renderer
        .render_to(&mut buffer, &app)
        .map_err(Into::<Error>::into)?;
    Ok(buffer)
}

#[component]
fn SharesElement(outgoing: Vec<ShareWrapper>, incoming: Vec<ShareWrapper>) -> Element {
    rsx! {
        h3 {"Share your calendar"},
        form {
            action: "javascript:requestShare();",
            input {"type": "email", name: "share_email", id: "share_email", placeholder: "Recipient Email"},
            input {
                "type": "button",
                name: "request_share",
                value: "Share",
                "onclick": "requestShare();",
            },
        },
        h3 {"Shared by you"},
        table {
            "border": "1",
            class: "dataframe",
            thead {
                th {"Recipient"},
                th {"Status"},
            },
            tbody {
                {outgoing.iter().enumerate().map(|(idx, share)| {
                    let username = &share.counterparty_username;
                    let status = &share.status;
                    rsx! {
                        tr {
                            key: "outgoing-key-{idx}",
                            td {"{username}"},
                            td {"{status}"},
                        }
                    }
                })}
            }
        },
        h3 {"Shared with you"},
        table {
            "border": "1",
            class: "dataframe",
            thead {
                th {"Owner"},
                th {"Status"},
                th {},
            },
            tbody {
                {incoming.iter().enumerate().map(|(idx, share)| {
                    let username = &share.counterparty_username;
                    let status = &share.status;
                    let share_id = share.id;
                    let actions = if share.status.as_str() == "pending" {
                        Some(rsx! {
                            input {
                                "type": "button",
                                name: "accept_share",
                                value: "Accept",
                                "onclick": "respondShare('{share_id}', true)",
                            },
                            input {
                                "type": "button",
                                name: "decline_share",
                                value: "Decline",
                                "onclick": "respondShare('{share_id}', false)",
                            },
                        })
                    } else if share.status.as_str() == "accepted" {
                        Some(rsx! {
                            input {
                                "type": "button",
                                name: "view_shared",
                                value: "View Week",
                                "onclick": "displaySharedWeek('{share_id}')",
                            }
                        })
                    } else {
                        None
                    };
                    rsx! {
                        tr {
                            key: "incoming-key-{idx}",
                            td {"{username}"},
                            td {"{status}"},
                            td { {actions} },
                        }
                    }
                })}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use stack_string::StackString;

    use crate::elements::{generate_time_choices, login_body, shares_body, weekday_abbrev};

    #[test]
    fn test_generate_time_choices() {
        let choices = generate_time_choices(false);
        assert_eq!(choices.len(), 48);
        assert_eq!(choices[0].as_str(), "00:00");
        assert_eq!(choices[1].as_str(), "00:30");
        assert_eq!(choices[47].as_str(), "23:30");

        let choices = generate_time_choices(true);
        assert_eq!(choices.len(), 49);
        assert_eq!(choices[48].as_str(), "23:59");
    }

    #[test]
    fn test_weekday_abbrev() {
        assert_eq!(weekday_abbrev(0), "Mon");
        assert_eq!(weekday_abbrev(6), "Sun");
        assert_eq!(weekday_abbrev(9), "?");
    }

    #[test]
    fn test_login_body_renders_forms() {
        let body = login_body().unwrap();
        assert!(body.contains("/schedule/login"));
        assert!(body.contains("/schedule/signup"));
        assert!(body.contains("/schedule/password-reset/request"));
    }

    #[test]
    fn test_shares_body_renders_empty_tables() {
        let body = shares_body(Vec::new(), Vec::new()).unwrap();
        assert!(body.contains("Shared by you"));
        assert!(body.contains("Shared with you"));
    }

    #[test]
    fn test_time_choice_type() {
        let choices = generate_time_choices(false);
        let first: &StackString = &choices[0];
        assert!(!first.is_empty());
    }
}

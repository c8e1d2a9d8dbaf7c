use axum::{
    Router,
    http::Method,
    response::Redirect,
    routing::{delete, get, post},
};
use log::{debug, error};
use stack_string::format_sstr;
use std::{net::SocketAddr, time::Duration};
use tokio::{net::TcpListener, time::interval};
use tower_http::cors::{Any, CorsLayer};

use schedule_app_lib::{
    config::Config, models::Session, pgpool::PgPool, planner::WeekPlanner,
};

use crate::{
    errors::ServiceError as Error,
    routes::{
        build_event, create_event, create_share, delete_event, edit_event, list_events,
        list_shares, login, login_page, logout, password_reset_confirm, password_reset_request,
        respond_share, schedule_index, shared_week_view, signup, update_theme, user, week_view,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub planner: WeekPlanner,
}

/// # Errors
/// Returns error if `init_config` fails
pub async fn start_app() -> Result<(), Error> {
    let config = Config::init_config()?;
    run_app(&config).await
}

async fn run_app(config: &Config) -> Result<(), Error> {
    async fn cleanup_sessions(pool: PgPool) {
        let mut i = interval(Duration::from_secs(3600));
        loop {
            i.tick().await;
            match Session::delete_expired(&pool).await {
                Ok(removed) if removed > 0 => debug!("removed {removed} expired sessions"),
                Ok(_) => {}
                Err(e) => error!("session cleanup failed: {e}"),
            }
        }
    }
    let pool = PgPool::new(&config.database_url, config.n_db_workers)?;
    let planner = WeekPlanner::new(config.clone(), pool);

    tokio::task::spawn(cleanup_sessions(planner.pool.clone()));

    let app = AppState { planner };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(["content-type".try_into()?])
        .allow_origin(Any);

    let router = Router::new()
        .route("/", get(|| async { Redirect::to("/schedule/login") }))
        .route("/schedule/index.html", get(schedule_index))
        .route("/schedule/login", get(login_page).post(login))
        .route("/schedule/signup", post(signup))
        .route("/schedule/logout", get(logout))
        .route("/schedule/password-reset/request", post(password_reset_request))
        .route("/schedule/password-reset/confirm", post(password_reset_confirm))
        .route("/schedule/week", get(week_view))
        .route("/schedule/week/{share_id}", get(shared_week_view))
        .route("/schedule/list_events", get(list_events))
        .route("/schedule/create_event", get(build_event).post(create_event))
        .route("/schedule/edit_event/{event_id}", post(edit_event))
        .route("/schedule/delete_event", delete(delete_event))
        .route("/schedule/shares", get(list_shares))
        .route("/schedule/share", post(create_share))
        .route("/schedule/share/respond", post(respond_share))
        .route("/schedule/theme", post(update_theme))
        .route("/schedule/user", get(user))
        .with_state(app)
        .layer(cors);

    let host = &config.host;
    let port = config.port;

    let addr: SocketAddr = format_sstr!("{host}:{port}").parse()?;
    debug!("{addr:?}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(Into::into)
}

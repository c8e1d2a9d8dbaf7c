use anyhow::Error;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use stack_string::{StackString, format_sstr};
use stdout_channel::StdoutChannel;
use time::{Date, macros::format_description};
use tokio_postgres::NoTls;

use crate::{
    config::Config,
    get_default_or_local_time,
    models::User,
    planner::{NewUser, SignupOutcome, WeekPlanner},
    pgpool::PgPool,
    schedule::DisplayAnchor,
};

mod embedded {
    refinery::embed_migrations!("../migrations");
}

#[derive(Subcommand, Debug)]
pub enum ScheduleActions {
    /// Apply database migrations
    RunMigrations,
    /// List registered users
    ListUsers,
    /// Create a user account
    AddUser {
        #[arg(short, long)]
        email: StackString,
        #[arg(short, long)]
        username: StackString,
        #[arg(long)]
        first_name: StackString,
        #[arg(long)]
        last_name: StackString,
        #[arg(short, long)]
        password: StackString,
    },
    /// List one user's stored events
    ListEvents {
        #[arg(short, long)]
        email: StackString,
    },
    /// Print the materialized week for one user
    PrintWeek {
        #[arg(short, long)]
        email: StackString,
        #[arg(short, long)]
        /// Reference date (YYYY-MM-DD, defaults to today)
        date: Option<StackString>,
    },
}

#[derive(Parser, Debug)]
pub struct ScheduleCliOpts {
    #[command(subcommand)]
    action: Option<ScheduleActions>,
}

impl ScheduleCliOpts {
    /// # Errors
    /// Returns error on config, database or output failure
    pub async fn parse_opts() -> Result<(), Error> {
        let opts = Self::parse();
        let action = opts.action.unwrap_or(ScheduleActions::ListUsers);

        let config = Config::init_config()?;
        let stdout = StdoutChannel::<StackString>::new();

        if let ScheduleActions::RunMigrations = action {
            let (mut client, conn) =
                tokio_postgres::connect(&config.database_url, NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    log::error!("connection error: {e}");
                }
            });
            let report = embedded::migrations::runner().run_async(&mut client).await?;
            stdout.send(format_sstr!(
                "applied {} migrations",
                report.applied_migrations().len()
            ));
            stdout.close().await?;
            return Ok(());
        }

        let pool = PgPool::new(&config.database_url, config.n_db_workers)?;
        let planner = WeekPlanner::new(config, pool);

        match action {
            ScheduleActions::RunMigrations => unreachable!(),
            ScheduleActions::ListUsers => {
                let users = User::get_all(&planner.pool).await?;
                for user in users
                    .into_iter()
                    .sorted_by(|a, b| a.username.cmp(&b.username))
                {
                    let created = get_default_or_local_time(user.created_at, &planner.config);
                    stdout.send(format_sstr!(
                        "{} {} created {created}",
                        user.username,
                        user.email
                    ));
                }
            }
            ScheduleActions::AddUser {
                email,
                username,
                first_name,
                last_name,
                password,
            } => {
                let outcome = planner
                    .create_user(NewUser {
                        first_name,
                        last_name,
                        username,
                        email,
                        password,
                        theme: None,
                    })
                    .await?;
                match outcome {
                    SignupOutcome::Created(user) => {
                        stdout.send(format_sstr!("created user {}", user.username));
                    }
                    SignupOutcome::Invalid(message) => stdout.send(message),
                }
            }
            ScheduleActions::ListEvents { email } => {
                let Some(user) = User::get_by_email(&email, &planner.pool).await? else {
                    stdout.send(format_sstr!("no user {email}"));
                    stdout.close().await?;
                    return Ok(());
                };
                for event in planner.user_events(user.id).await? {
                    stdout.send(format_sstr!(
                        "{} {}-{} date {:?} days {:?}",
                        event.title,
                        event.start,
                        event.end,
                        event.date,
                        event.days,
                    ));
                }
            }
            ScheduleActions::PrintWeek { email, date } => {
                let Some(user) = User::get_by_email(&email, &planner.pool).await? else {
                    stdout.send(format_sstr!("no user {email}"));
                    stdout.close().await?;
                    return Ok(());
                };
                let reference = match date {
                    Some(date) => Some(Date::parse(
                        &date,
                        format_description!("[year]-[month]-[day]"),
                    )?),
                    None => None,
                };
                for event in planner.week_display(&user, reference).await? {
                    let anchor = match event.anchor {
                        DisplayAnchor::Date(date) => StackString::from_display(date),
                        DisplayAnchor::Weekday(day) => StackString::from_display(day),
                    };
                    stdout.send(format_sstr!("{anchor} {}", event.label));
                }
            }
        }

        stdout.close().await?;
        Ok(())
    }
}

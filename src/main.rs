use anyhow::Error;

use schedule_app_lib::cli_opts::ScheduleCliOpts;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    tokio::spawn(async move { ScheduleCliOpts::parse_opts().await })
        .await
        .unwrap()
}

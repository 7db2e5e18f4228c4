// Entrypoint for the monthly progress report.
// - Keeps `main` small: load settings, enable logging, hand off to the UI.
// - Returns `anyhow::Result` so any failure ends the run with its message.

use toggl_progress::{config::Config, logging, ui};

fn main() -> anyhow::Result<()> {
    // `.env` is optional; real environment variables take precedence.
    dotenvy::dotenv().ok();
    logging::enable_logging()?;

    let config = Config::from_env()?;
    ui::run(config)
}

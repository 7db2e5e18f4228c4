// UI layer: the one-shot terminal flow. Resolves the API token, fetches
// both months with a spinner running, then renders the chart.

use crate::api::{EntryRow, TogglClient};
use crate::calendar::{MonthWindow, MonthlyTarget, PacingSource};
use crate::config::Config;
use crate::report::Reporter;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const TOKEN_FILE: &str = ".toggl_token";

/// Fetch last month and this month, draw the progress chart and print a
/// short summary.
pub fn run(config: Config) -> Result<()> {
    let token = resolve_token(&config)?;
    let mut client = TogglClient::from_config(&config, &token)?;
    let window = MonthWindow::current();
    let reporter = Reporter::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress = with_spinner(&spinner, |spinner| {
        fetch_and_plot(&mut client, &reporter, &window, config.monthly_target, spinner)
    })?;

    match progress.target {
        Some(t) => {
            let (normal, crunch) =
                t.minimum_daily_hours(window.business_days_left(), window.days_left());
            println!(
                "Tracked {:.1}h of {:.1}h ({} days left): {:.1}h/day, {:.1}h/weekday",
                progress.tracked_hours,
                t.target_hours,
                window.days_left(),
                normal,
                crunch
            );
        }
        None => println!("Tracked {:.1}h this month", progress.tracked_hours),
    }
    println!("Chart written to {}", progress.path.display());
    Ok(())
}

/// Run `work` and clear the spinner whether it succeeds or fails.
fn with_spinner<T>(spinner: &ProgressBar, work: impl FnOnce(&ProgressBar) -> Result<T>) -> Result<T> {
    let outcome = work(spinner);
    spinner.finish_and_clear();
    outcome
}

struct Progress {
    tracked_hours: f64,
    target: Option<MonthlyTarget>,
    path: PathBuf,
}

fn fetch_and_plot(
    client: &mut TogglClient,
    reporter: &Reporter,
    window: &MonthWindow,
    monthly_target: Option<f64>,
    spinner: &ProgressBar,
) -> Result<Progress> {
    spinner.set_message("Fetching last month...");
    let (start, end) = window.last_month_range();
    let last_month = client.fetch_entry_table(start, end)?;

    spinner.set_message("Fetching this month...");
    let (start, end) = window.this_month_range();
    let this_month = client.fetch_entry_table(start, end)?;
    let tracked_hours = tracked_hours(&this_month);

    spinner.set_message("Plotting progress this month...");
    let target = monthly_target.map(|target_hours| MonthlyTarget {
        target_hours,
        tracked_hours,
    });
    let path = reporter.plot_progress_this_month(
        &last_month,
        &this_month,
        window,
        target.as_ref().map(|t| t as &dyn PacingSource),
    )?;

    Ok(Progress {
        tracked_hours,
        target,
        path,
    })
}

/// Sum of row hours; equals `TogglClient::total_hours` for the same range.
fn tracked_hours(rows: &[EntryRow]) -> f64 {
    rows.iter().map(|row| row.hours).sum()
}

/// Token from the environment, then the token file, then a prompt.
fn resolve_token(config: &Config) -> Result<String> {
    if let Some(token) = &config.api_token {
        return Ok(token.clone());
    }
    if let Ok(token) = load_token() {
        debug!("using token from home directory");
        return Ok(token);
    }

    // `Password` hides input in terminal.
    let token: String = Password::new()
        .with_prompt("Toggl API token")
        .interact()
        .context("Reading API token")?;
    if Confirm::new()
        .with_prompt("Save token for future runs?")
        .default(false)
        .interact()?
    {
        persist_token(&token)?;
    }
    Ok(token)
}

fn token_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE)
}

/// Persist token into a file in the user's home directory.
fn persist_token(token: &str) -> Result<()> {
    std::fs::write(token_path(), token).context("Saving API token")?;
    Ok(())
}

/// Load token from the user's home directory file.
fn load_token() -> Result<String> {
    let data = std::fs::read_to_string(token_path())?;
    let token = data.trim();
    anyhow::ensure!(!token.is_empty(), "empty token file");
    Ok(token.to_string())
}

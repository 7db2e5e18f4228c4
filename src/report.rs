// Reporting module: reshapes two monthly entry tables into cumulative
// daily series and draws them as a line chart.

use anyhow::{anyhow, Result};
use chrono::Datelike;
use plotters::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::EntryRow;
use crate::calendar::{MonthWindow, PacingSource};

/// Where `plot_progress_this_month` writes the chart.
pub const CHART_PATH: &str = "month_progress.png";

/// 6.4 x 4.8 inches at 300 DPI.
const CHART_SIZE: (u32, u32) = (1920, 1440);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthLabel {
    LastMonth,
    ThisMonth,
    Expected,
}

impl MonthLabel {
    /// Legend order of the chart.
    pub const LEGEND_ORDER: [MonthLabel; 3] =
        [MonthLabel::Expected, MonthLabel::LastMonth, MonthLabel::ThisMonth];

    fn color(self) -> RGBColor {
        match self {
            MonthLabel::Expected => RGBColor(76, 114, 176),
            MonthLabel::LastMonth => RGBColor(221, 132, 82),
            MonthLabel::ThisMonth => RGBColor(85, 168, 104),
        }
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthLabel::LastMonth => f.write_str("Last Month"),
            MonthLabel::ThisMonth => f.write_str("This Month"),
            MonthLabel::Expected => f.write_str("Expected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub month: MonthLabel,
    pub date: u32,
    pub hours: f64,
}

impl SeriesPoint {
    fn new(month: MonthLabel, date: u32, hours: f64) -> Self {
        SeriesPoint { month, date, hours }
    }
}

fn hours_on(table: &[EntryRow], day: u32) -> f64 {
    table.iter().filter(|row| row.date == day).map(|row| row.hours).sum()
}

/// Builds the month progress chart. `today` is fixed when the reporter is
/// created.
#[derive(Debug, Clone)]
pub struct Reporter {
    today: u32,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self::with_today(chrono::Local::now().day())
    }

    pub fn with_today(today: u32) -> Self {
        Reporter { today }
    }

    pub fn today(&self) -> u32 {
        self.today
    }

    /// Cumulative series for days `1..month_end_day`.
    ///
    /// Up to today, `Expected` follows `This Month`. After today it grows
    /// by `crunch_min_hours` per day and `This Month` stops. Without a
    /// crunch value only `Last Month` is emitted for future days.
    pub fn progress_series(
        &self,
        last_month: &[EntryRow],
        this_month: &[EntryRow],
        month_end_day: u32,
        crunch_min_hours: Option<f64>,
    ) -> Vec<SeriesPoint> {
        let mut points = Vec::new();
        let mut cum_hours_last_month = 0.0;
        let mut cum_hours_this_month = 0.0;

        for day in 1..month_end_day {
            cum_hours_last_month += hours_on(last_month, day);
            points.push(SeriesPoint::new(MonthLabel::LastMonth, day, cum_hours_last_month));

            if day <= self.today {
                cum_hours_this_month += hours_on(this_month, day);
                points.push(SeriesPoint::new(MonthLabel::ThisMonth, day, cum_hours_this_month));
                points.push(SeriesPoint::new(MonthLabel::Expected, day, cum_hours_this_month));
            } else if let Some(crunch) = crunch_min_hours {
                cum_hours_this_month += crunch;
                points.push(SeriesPoint::new(MonthLabel::Expected, day, cum_hours_this_month));
            }
        }
        points
    }

    /// Render last month against this month (and the expected pace when a
    /// pacing source is given) to `CHART_PATH`.
    pub fn plot_progress_this_month(
        &self,
        last_month: &[EntryRow],
        this_month: &[EntryRow],
        window: &MonthWindow,
        pacing: Option<&dyn PacingSource>,
    ) -> Result<PathBuf> {
        let crunch = pacing.map(|p| {
            let (_normal, crunch) =
                p.minimum_daily_hours(window.business_days_left(), window.days_left());
            crunch
        });
        let points =
            self.progress_series(last_month, this_month, window.month_end_day(), crunch);

        let path = PathBuf::from(CHART_PATH);
        render_chart(&points, &path)?;
        info!(path = %path.display(), points = points.len(), "progress chart written");
        Ok(path)
    }
}

/// Draw one line per label onto a PNG at `path`, overwriting it.
pub fn render_chart(points: &[SeriesPoint], path: &Path) -> Result<()> {
    let max_day = points.iter().map(|p| p.date).max().unwrap_or(1).max(2);
    let max_hours = points.iter().map(|p| p.hours).fold(0.0_f64, f64::max);
    let y_top = if max_hours > 0.0 { max_hours * 1.05 } else { 1.0 };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("{e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(40)
        .x_label_area_size(90)
        .y_label_area_size(110)
        .build_cartesian_2d(1u32..max_day, 0f64..y_top)
        .map_err(|e| anyhow!("{e}"))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Hours")
        .label_style(("sans-serif", 32))
        .axis_desc_style(("sans-serif", 40))
        .draw()
        .map_err(|e| anyhow!("{e}"))?;

    for label in MonthLabel::LEGEND_ORDER {
        let color = label.color();
        let series = points
            .iter()
            .filter(|p| p.month == label)
            .map(|p| (p.date, p.hours));
        chart
            .draw_series(LineSeries::new(series, color.stroke_width(4)))
            .map_err(|e| anyhow!("{e}"))?
            .label(label.to_string())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 40, y)], color.stroke_width(4)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", 32))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow!("{e}"))?;

    root.present().map_err(|e| anyhow!("{e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: u32, hours: f64) -> EntryRow {
        EntryRow {
            project: "Acme".into(),
            entry: "work".into(),
            hours,
            billable: false,
            date,
        }
    }

    fn series(points: &[SeriesPoint], label: MonthLabel) -> Vec<(u32, f64)> {
        points
            .iter()
            .filter(|p| p.month == label)
            .map(|p| (p.date, p.hours))
            .collect()
    }

    struct FixedPace(f64, f64);

    impl PacingSource for FixedPace {
        fn minimum_daily_hours(&self, _business_days_left: u32, _days_left: u32) -> (f64, f64) {
            (self.0, self.1)
        }
    }

    #[test]
    fn two_month_scenario() {
        let last = [row(1, 6.0), row(1, 4.0), row(2, 5.0)];
        let this = [row(1, 3.0)];
        let points = Reporter::with_today(1).progress_series(&last, &this, 3, Some(7.5));

        assert_eq!(
            points,
            vec![
                SeriesPoint::new(MonthLabel::LastMonth, 1, 10.0),
                SeriesPoint::new(MonthLabel::ThisMonth, 1, 3.0),
                SeriesPoint::new(MonthLabel::Expected, 1, 3.0),
                SeriesPoint::new(MonthLabel::LastMonth, 2, 15.0),
                SeriesPoint::new(MonthLabel::Expected, 2, 10.5),
            ]
        );
    }

    #[test]
    fn expected_tracks_actuals_until_today_then_crunch() {
        let this = [row(1, 2.0), row(2, 1.0), row(3, 4.0), row(9, 100.0)];
        let points = Reporter::with_today(3).progress_series(&[], &this, 7, Some(2.0));

        let actual = series(&points, MonthLabel::ThisMonth);
        let expected = series(&points, MonthLabel::Expected);
        assert_eq!(actual, vec![(1, 2.0), (2, 3.0), (3, 7.0)]);
        assert_eq!(&expected[..3], &actual[..]);
        assert_eq!(&expected[3..], &[(4, 9.0), (5, 11.0), (6, 13.0)]);
    }

    #[test]
    fn last_month_is_cumulative_for_every_day() {
        let last = [row(2, 1.0), row(4, 2.5)];
        let points = Reporter::with_today(1).progress_series(&last, &[], 6, None);
        assert_eq!(
            series(&points, MonthLabel::LastMonth),
            vec![(1, 0.0), (2, 1.0), (3, 1.0), (4, 3.5), (5, 3.5)]
        );
    }

    #[test]
    fn no_pacing_leaves_future_days_to_last_month() {
        let points = Reporter::with_today(2).progress_series(&[row(1, 1.0)], &[row(1, 1.0)], 5, None);
        assert!(points.iter().filter(|p| p.date > 2).all(|p| p.month == MonthLabel::LastMonth));
        assert_eq!(series(&points, MonthLabel::Expected), vec![(1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn crunch_minimum_carries_expected_to_month_end() {
        let window = MonthWindow::containing(chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        let (_, crunch) = FixedPace(1.0, 3.0)
            .minimum_daily_hours(window.business_days_left(), window.days_left());
        let points =
            Reporter::with_today(1).progress_series(&[], &[], window.month_end_day(), Some(crunch));
        let expected = series(&points, MonthLabel::Expected);
        assert_eq!(expected.len(), 29);
        assert_eq!(expected.last(), Some(&(29, 84.0)));
    }

    #[test]
    fn chart_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.png");
        let last = [row(1, 8.0), row(2, 6.0), row(5, 7.5)];
        let this = [row(1, 4.0), row(3, 9.0)];
        let points = Reporter::with_today(3).progress_series(&last, &this, 8, Some(2.0));

        render_chart(&points, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']));
    }

    #[test]
    fn labels_render_as_legend_text() {
        let names: Vec<String> = MonthLabel::LEGEND_ORDER.iter().map(|l| l.to_string()).collect();
        assert_eq!(names, ["Expected", "Last Month", "This Month"]);
    }
}

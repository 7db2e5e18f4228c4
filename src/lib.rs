// Library root
// -----------
// This crate exposes a small library surface for the monthly progress
// report. The binary (`main.rs`) wires these modules together.
//
// Module responsibilities:
// - `api`: Toggl REST client (URL building, basic auth, throttling,
//   project name cache, entry tables and totals).
// - `report`: turns two monthly entry tables into cumulative series and
//   renders the progress chart.
// - `calendar`: month window arithmetic and the pacing source.
// - `config`, `error`, `logging`: ambient plumbing.
// - `ui`: the one-shot terminal flow used by the binary.
pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod ui;

//! Tally core library: survey response storage, session cache and analysis.
//!
//! Responses are appended through a [`store::ResponseStore`] (CSV or `SQLite`)
//! and read back through a [`session::SurveySession`], whose lazily loaded
//! cache feeds the charts in [`analyze::distribution`] and the clustering in
//! [`analyze::cluster`].

pub mod analyze;
pub mod cache;
pub mod config;
pub mod error;
pub mod questionnaire;
pub mod render;
pub mod session;
pub mod store;
pub mod types;

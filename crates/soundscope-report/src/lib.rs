//! Turns a user's top tracks into the rows shown on the dashboard.

pub mod report;
pub mod track_record;

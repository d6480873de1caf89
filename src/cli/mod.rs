//! Terminal presentation of the lookups

pub mod chart;
pub mod convert;
pub mod pick;
pub mod search;
pub mod series;
pub mod setup;
pub mod ui;

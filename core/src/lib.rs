//! Adaptive coaching engine: calorie targets that learn from the weight trend, daily plan
//! adherence, and a prioritized coach message, backed by a local SQLite store.

pub mod adherence;
pub mod calculators;
pub mod calibration;
pub mod coach;
pub mod csv_import;
pub mod db;
pub mod models;
pub mod service;

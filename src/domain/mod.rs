//! Core domain types and logic.

pub mod error;
pub mod order;
pub mod params;
pub mod results;
pub mod measurement;
pub mod field;
pub mod formulation;
pub mod retry;
pub mod price_comp;
pub mod sweep;
pub mod index;
pub mod aggregate;
pub mod compare;
pub mod sweep_query;
pub mod series;
pub mod config_validation;

//! Port traits for external collaborators.

pub mod config_port;
pub mod figure_port;
pub mod record_port;
pub mod solver_port;

pub mod config;
pub mod error;
pub mod net;
pub mod race;
pub mod report;
pub mod state;
pub mod threshold;
pub mod vehicle;

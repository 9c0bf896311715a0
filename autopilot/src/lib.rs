pub mod benchmark;
pub mod config;
pub mod policies;
pub mod runner;
pub mod scenarios;
pub mod sim;
pub mod util;

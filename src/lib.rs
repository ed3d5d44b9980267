pub mod cli;
pub mod config;
pub mod hex;
pub mod persistence;
pub mod region;
pub mod simulation;
pub mod store;
pub mod weather;

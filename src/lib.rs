pub mod db;
pub mod draft;
pub mod error;
pub mod extract;
mod migrations;
pub mod orchestrator;
pub mod persist;
pub mod reconcile;
pub mod review;
pub mod roster;
pub mod services;
pub mod state;
pub mod types;
pub mod util;

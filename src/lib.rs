pub mod config;
pub mod db;
pub mod models;
pub mod query;
pub mod ratelimit;
pub mod responses;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;

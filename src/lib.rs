pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod payload;
pub mod queue;
pub mod routes;
pub mod state;
pub mod storage;
pub mod types;

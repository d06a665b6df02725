//! Hermes gateway: the HTTP liveness surface kept alongside the bot.

pub mod health_api;
pub mod server;

pub use health_api::HealthReport;
pub use server::{GatewayState, router, serve, start_server};

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod match_state;
pub mod narration;
pub mod night;
pub mod personas;
pub mod rng;
pub mod roles;
pub mod server_protocol;
pub mod server_utils;
pub mod strategy;
pub mod types;
pub mod voting;
pub mod win;

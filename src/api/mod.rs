pub mod credential;
pub mod desktop;
pub mod error;
pub mod execute;
pub mod generate;
pub mod handler_utils;
pub mod models;
pub mod outputs;
pub mod routes;
pub mod server;

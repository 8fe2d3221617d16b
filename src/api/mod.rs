pub mod auth;
pub mod client;
pub mod models;
pub mod resolver;
pub mod search;
pub mod store;

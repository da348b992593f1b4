pub mod app;
pub mod auction;
pub mod auth;
pub mod bidding;
pub mod config;
pub mod database;
pub mod event_store;
pub mod handlers;
pub mod message_broker;
pub mod query;
pub mod render;
pub mod store;

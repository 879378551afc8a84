pub mod auction;
pub mod auth;
pub mod bidding;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod event_store;
pub mod handlers;
pub mod message_broker;
pub mod participants;
pub mod query;
pub mod scheduler;

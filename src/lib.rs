pub mod errors;
pub mod handlers;
pub mod helpers;
pub mod jwtoken;
pub mod loggers;
pub mod models;
pub mod server_messages;
pub mod state;
pub mod storage;

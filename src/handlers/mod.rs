pub mod command_handler;
pub mod connection_handler;
pub mod game_handler;
pub mod matchmaker;
pub mod timeout_handler;
pub mod view_handler;

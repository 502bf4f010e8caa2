pub mod config;
pub mod death;
pub mod event;
pub mod game;
pub mod player;
pub mod role;
pub mod segment;

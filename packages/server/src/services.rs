pub mod cues;
pub mod death_manager;
pub mod events_actions;
pub mod game_actions;
pub mod notifier;
pub mod segments_manager;
pub mod session;
pub mod special_scenarios;
pub mod timers;

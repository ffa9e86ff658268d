pub mod config;
pub mod game_state;
pub mod player;
pub mod role;
pub mod round_result;

//! Simulation core and wire protocol shared by the relay server and the clients.

pub mod ball;
pub mod collision;
pub mod config;
pub mod input;
pub mod match_state;
pub mod particles;
pub mod protocol;
pub mod sim;
pub mod vec2;
pub mod vehicle;

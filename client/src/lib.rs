//! Headless CarBall client: connects to the relay, plays through a [`MatchContext`] and
//! lets an autopilot do the driving.
//!
//! [`MatchContext`]: carball_shared::sim::MatchContext

pub mod autopilot;
pub mod connection;
pub mod options;
pub mod session;

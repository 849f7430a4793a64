//! Chatid Core
//!
//! Identity resolution and response composition: given an inbound Telegram
//! update in any of its shapes (forward, reply, shared peer, mention,
//! username lookup, business connection), work out which single chat it
//! refers to and answer with its ID

pub mod compose;
pub mod dispatch;
pub mod gateway;
pub mod handlers;
pub mod identity;
pub mod resolve;

pub use gateway::Transport;
pub use handlers::EventHandler;
pub use identity::{Identity, Resolution};

//! All packets understood by the death authority and its clients.
//!
//! Clientbound and serverbound IDs are numbered independently.

mod death_state_s2c;
mod death_timer_s2c;
mod respawn_request_c2s;
mod respawn_s2c;
mod system_chat_s2c;

pub use death_state_s2c::DeathStateS2c;
pub use death_timer_s2c::DeathTimerS2c;
pub use respawn_request_c2s::RespawnRequestC2s;
pub use respawn_s2c::RespawnS2c;
pub use system_chat_s2c::SystemChatS2c;

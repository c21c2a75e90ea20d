pub mod browser;
pub mod control;
pub mod core;
pub mod features;

// --- Primary core exports ---
pub use core::arbiter;
pub use core::types;
pub use core::AppState;
pub use features::{autopilot, episodes, fullscreen, visibility};

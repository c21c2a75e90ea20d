pub mod autopilot;
pub mod episodes;
pub mod fullscreen;
pub mod visibility;

pub use autopilot::Autopilot;

pub mod app_state;
pub mod arbiter;
pub mod clock;
pub mod config;
pub mod settings;
pub mod types;

pub use app_state::AppState;
pub use arbiter::{ActionKind, Arbiter, BlockOptions, NavigationRole};

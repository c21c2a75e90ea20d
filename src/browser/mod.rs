pub mod browser_manager;
pub mod cdp;
pub mod driver;
pub mod page_script;

pub use browser_manager::BrowserSession;
pub use driver::PageDriver;

// StudyHub Core - Domain Logic & Ports
// NO infrastructure dependencies: the SQL driver lives behind the port layer

pub mod application;
pub mod domain;
pub mod error;
pub mod port;
pub mod schema;

pub use error::{Result, StoreError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

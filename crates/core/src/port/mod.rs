// Port Layer - Interfaces for external dependencies

pub mod account_store;
pub mod clock;

pub use account_store::{AccountStore, DuplicatePolicy, ImportReport};
pub use clock::{Clock, FixedClock, SystemClock};

// Application Layer - Use cases built on ports

mod accounts;

pub use accounts::{AccountService, Registration};

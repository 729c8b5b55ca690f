pub mod config;
pub mod contract;
pub mod drivers;
pub mod ssh;
pub mod transactional;

pub use contract::{DriverFactory, DriverRegistry, SwitchDriver};
pub use drivers::default_registry;
pub use transactional::TransactionalDriver;

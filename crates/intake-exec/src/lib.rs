pub mod contracts;
pub mod controller;
pub mod scheduler;
pub mod service;

pub use contracts::*;
pub use controller::*;
pub use scheduler::*;
pub use service::*;

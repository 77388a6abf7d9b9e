//! Request handlers.

pub mod health;
pub mod modes;
pub mod sessions;

pub use health::*;
pub use modes::*;
pub use sessions::*;

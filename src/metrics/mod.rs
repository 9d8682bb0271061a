pub mod collector;
pub mod reporter;
pub mod types;

pub use collector::*;
pub use reporter::*;
pub use types::*;

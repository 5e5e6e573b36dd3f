pub mod env;
pub mod resolved;
pub mod types;

pub use env::*;
pub use resolved::*;
pub use types::*;

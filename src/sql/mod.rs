//! Safe SQL builder and row decoding: identifiers from metadata only, values as parameters.

mod builder;
mod row;
pub use builder::*;
pub use row::row_to_json;

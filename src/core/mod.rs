pub mod error;
pub mod value;

pub use error::{Result, StoreError};
pub use value::Value;

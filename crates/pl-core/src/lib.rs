pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod types;
pub mod value;

pub use diagnostics::*;
pub use error::ParleyError;
pub use expression::*;
pub use types::*;
pub use value::*;

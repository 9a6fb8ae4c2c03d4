mod accessibility;
mod attribute;

pub use accessibility::*;
pub use attribute::*;

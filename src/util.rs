mod modified_utf8;
mod segment;

pub use modified_utf8::*;
pub use segment::*;

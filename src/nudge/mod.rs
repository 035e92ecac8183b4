pub mod quota;
pub mod speaker;
pub mod text;

pub use quota::*;
pub use speaker::*;
pub use text::*;

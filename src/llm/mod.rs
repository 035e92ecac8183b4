pub mod adjudicator;
pub mod client;
pub mod prompts;

pub use adjudicator::*;
pub use client::*;
pub use prompts::*;

//! Chat moderation.

mod filter;
mod words;

pub use filter::ContentFilter;
pub use words::DisallowedTokenSet;

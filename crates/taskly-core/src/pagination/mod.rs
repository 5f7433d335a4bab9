//! Page tokens and backward navigation over forward-only cursors.

pub mod cursor;
pub mod token_stack;

pub use token_stack::{PreviousPage, TokenStack};

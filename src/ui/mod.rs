//! Terminal front end

mod cli;

pub use cli::*;

//! Terminal front-end over the store facades.

pub mod setup;
pub mod summary;
pub mod sync;
pub mod ui;

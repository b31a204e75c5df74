pub mod api;
pub mod events;
pub mod format;
pub mod models;
pub mod validation;

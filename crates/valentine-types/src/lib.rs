pub mod api;
pub mod generate;
pub mod models;

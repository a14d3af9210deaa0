pub mod billing;
pub mod catalog;
pub mod models;

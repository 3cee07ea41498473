pub mod api;
pub mod care;
pub mod models;
pub mod navigation;
pub mod session;

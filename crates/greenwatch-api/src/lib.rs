pub mod auth;
pub mod error;
pub mod form;
pub mod greenhouses;
pub mod images;
pub mod middleware;
pub mod plants;
pub mod routes;
pub mod sensors;
pub mod state;
pub mod users;
pub mod weather;

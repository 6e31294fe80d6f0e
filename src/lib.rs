//! Administrative course-lifecycle client for the aula virtual REST API.

pub mod admin;
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod filters;
pub mod forms;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod validation;

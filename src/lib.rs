pub mod advisor;
pub mod api;
pub mod config;
pub mod db;
pub mod job;
pub mod severity;

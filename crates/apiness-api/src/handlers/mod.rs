pub mod createdb;
pub mod data;
pub mod download;
pub mod routes;
pub mod upload;

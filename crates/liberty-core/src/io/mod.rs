pub mod download;
pub mod esa;
pub mod repository;

pub mod part_repository;
pub mod repository;
pub mod service;

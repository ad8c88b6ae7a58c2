pub mod connection;
pub mod kv_store;
pub mod persistent_store;
pub mod repository;

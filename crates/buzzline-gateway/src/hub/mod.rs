pub mod connection;
pub mod registry;
pub mod sink;
pub mod subscription;

pub mod api;
pub mod application_impl;
pub mod application_port;
pub mod domain_model;
pub mod domain_port;
pub mod gateway;
pub mod infra_memory;
pub mod infra_mysql;
pub mod infra_redis;
pub mod logger;
pub mod server;
pub mod settings;

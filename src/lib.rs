// Library for the binary and for tests to access modules

pub mod config;
pub mod filter;
pub mod models;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod rolling;
pub mod routes;
pub mod sources;
pub mod version;
pub mod worker;

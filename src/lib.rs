// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod envelope;
pub mod models;
pub mod numeric;
pub mod routes;
pub mod selection;
pub mod series;
pub mod session;
pub mod upstream_repo;
pub mod version;

// Library for tests to access modules

pub mod aggregator;
pub mod bucket_repo;
pub mod chart;
pub mod config;
pub mod models;
pub mod publisher;
pub mod routes;
pub mod sample_repo;
pub mod version;
pub mod worker;

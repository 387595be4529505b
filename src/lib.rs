// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod error;
pub mod models;
pub mod sample_repo;
pub mod sampler;
pub mod version;

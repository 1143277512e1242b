pub mod config;
pub mod engine;
pub mod limits;
pub mod live;
pub mod model;
pub mod notify;
pub mod observability;
pub mod store;

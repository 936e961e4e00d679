pub mod clean;
pub mod config;
pub mod domain;
pub mod error;
pub mod join;
pub mod metanetx;
pub mod pipeline;
pub mod reaction;
pub mod schema;
pub mod sheets;
pub mod store;
pub mod table;
pub mod validate;

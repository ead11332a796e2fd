pub mod pg;
pub mod schema;
pub mod store;

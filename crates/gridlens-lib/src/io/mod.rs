pub mod cache;
pub mod csv;

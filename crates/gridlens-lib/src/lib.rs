pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod explore;
pub mod help;
pub mod io;
pub mod plot;
pub mod select;
pub mod signal;

pub use analysis::*;
pub use dataset::*;
pub use error::*;
pub use signal::*;

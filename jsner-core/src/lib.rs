pub mod error;
pub mod export;
pub mod filter;
pub mod link;
pub mod scan;
pub mod store;

pub use error::CoreError;

// Re-export all model types for ease of use

pub mod record;
pub mod upload;

pub use record::*;
pub use upload::*;

pub mod config;
pub mod db;
pub mod errors;
pub mod facade;
pub mod models;
pub mod services;
pub mod stores;
pub mod test_utils;

pub use config::Config;
pub use errors::{StoreError, UploadError};
pub use facade::{DataFacade, UploadHandle};
pub use stores::{DocumentStore, ObjectStore, ProgressSender};

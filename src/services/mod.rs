pub mod s3_service;

pub use s3_service::{S3Config, S3Service};

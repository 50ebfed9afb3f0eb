//! External content services: S3-compatible object storage and OCR.

pub mod ocr;
pub mod s3;

pub use ocr::{OcrClient, OcrConfig, OcrError};
pub use s3::{S3Config, S3Storage, StorageError};

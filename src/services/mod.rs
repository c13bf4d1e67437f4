// Service exports
pub mod media;
pub mod rekognition;
pub mod s3;

pub use media::{MediaError, SubmittedPicker, UriImageLoader};
pub use rekognition::{CompareError, RekognitionClient};
pub use s3::{S3Client, StoreError};

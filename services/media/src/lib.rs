//! Media uploads: validation, object storage, metadata records and the
//! signed read path

pub mod catalog;
pub mod cdn;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod store;
pub mod validator;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{MediaCatalog, PublishedMedia};
pub use cdn::CloudFrontSigner;
pub use error::{CatalogError, StorageError, UploadError};
pub use models::{CandidateFile, MediaKind, MediaObject, UploadedMedia};
pub use pipeline::UploadPipeline;
pub use repository::{MediaStore, PgMediaStore};
pub use store::{ObjectStore, S3ObjectStore};
pub use validator::UploadPolicy;

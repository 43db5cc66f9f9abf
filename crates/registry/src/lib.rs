pub mod error;
pub mod registry;
pub mod repository;
pub mod validation;

pub use error::{ErrorKind, RegistryError};
pub use registry::{DocumentRegistry, SqliteRegistry, UploadOutcome};
pub use repository::{DocumentRepository, NewDocument, RepositoryError, SqliteDocumentRepository};
pub use validation::{UploadRequest, ALLOWED_EXTENSION, MAX_UPLOAD_BYTES};

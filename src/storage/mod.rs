pub mod credentials;
pub mod errors;

// Re-export key types for easy access
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use errors::StorageError;

pub use credentials::default_credentials_path;

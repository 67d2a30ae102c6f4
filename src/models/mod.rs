pub mod integration;
pub mod retrieval;

pub use integration::{
    ApiKeyRecord, Credentials, DecryptedIntegration, IntegrationRecord, NewApiKey, NewIntegration,
    Source,
};
pub use retrieval::{DEFAULT_LIMIT, FetchOptions, NewDataImport, RetrievalMetadata, RetrievedData};

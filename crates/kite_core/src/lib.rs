pub mod domain;
pub mod filters;
pub mod ports;
pub mod tokens;
pub mod validation;

pub use domain::{
    Credential, CredentialRecord, Difficulty, Metadata, Scope, User, UserCredentials, Word,
};
pub use filters::{PageSpec, SortDirection, SortSafeList, SortSpec};
pub use ports::{
    CredentialStore, PortError, PortResult, SearchQuery, UserStore, WordRepository,
};
pub use tokens::{hash_token_plaintext, CredentialIssuer};
pub use validation::Validator;

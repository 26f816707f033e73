pub mod claims;
pub mod login;
pub mod pipeline;
pub mod profile;
pub mod users;
pub mod verifier;

pub use claims::IdentityClaims;
pub use pipeline::{RequestState, authorize, populate_session};
pub use users::TenantUserResolver;
pub use verifier::{IdentityVerifier, OidcVerifier};

#![warn(warnings)]

pub mod claims;
pub mod claims_error;
pub mod context;
pub mod errors;
pub mod traits;
pub mod validation;

pub mod authorizer;
pub mod providers;

#[cfg(feature = "axum-ext")]
pub mod axum_ext;

pub use authorizer::authorize_owner;
pub use claims::Claims;
pub use claims_error::ClaimsError;
pub use context::SecurityContext;
pub use errors::AuthError;
pub use providers::hs256::Hs256Validator;
pub use traits::TokenValidator;
pub use validation::ValidationConfig;

#[cfg(feature = "axum-ext")]
pub use axum_ext::{AuthMode, Authz, authenticate};

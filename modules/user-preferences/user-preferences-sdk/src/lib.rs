//! Public surface of the user-preferences module.
//!
//! Consumers depend on this crate only; the implementation crate stays
//! behind the [`UserPreferencesApi`] trait.

pub mod api;
pub mod errors;
pub mod models;

pub use api::UserPreferencesApi;
pub use errors::PreferencesError;
pub use models::Preferences;

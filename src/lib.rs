//! Client-side auth session management.
//!
//! ARCHITECTURE
//! ============
//! - [`manager::SessionManager`] wraps a hosted [`provider::AuthProvider`]
//!   (GoTrue/Supabase), retries transient failures, and mirrors pushed
//!   session changes into a `watch` channel.
//! - [`local::LocalSessionManager`] is the offline fallback backed by a
//!   persisted user registry.
//! - [`backend::SessionBackend`] is the shared contract; pick one with
//!   [`backend::backend_from_config`].

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod local;
pub mod manager;
pub mod provider;
pub mod retry;
pub mod store;
pub mod types;

pub use backend::{SessionBackend, backend_from_config};
pub use config::AuthConfig;
pub use error::{AuthError, is_transient_error};
pub use types::{AuthData, AuthEvent, AuthSnapshot, Session, User};

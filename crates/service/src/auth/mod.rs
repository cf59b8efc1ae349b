//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login, password reset and Google sign-in live here; token
//! encoding is shared with the HTTP middleware through [`token`].

pub mod domain;
pub mod errors;
pub mod google;
pub mod repository;
pub mod service;
pub mod repo;
pub mod token;

pub use service::AuthService;

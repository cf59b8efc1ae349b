//! Domain services of the CultuCat backend.
//! - One module per area (events, accounts, friendships, chats, groups...).
//! - Functions are generic over `sea_orm::ConnectionTrait` and return `ServiceResult`.
//! - Entities and row-level validation live in the `models` crate.

pub mod errors;
pub mod auth;
pub mod runtime;
pub mod geo;
pub mod pagination;
pub mod events;
pub mod route_planner;
pub mod notifications;
pub mod mail;
pub mod accounts;
pub mod friendships;
pub mod chats;
pub mod groups;
pub mod reviews;
pub mod calendar;
pub mod agenda;
#[cfg(test)]
pub mod test_support;

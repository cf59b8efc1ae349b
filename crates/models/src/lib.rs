pub mod errors;
pub mod db;
pub mod kinds;
pub mod calendar;
pub mod place;
pub mod file;
pub mod category;
pub mod field;
pub mod user;
pub mod user_credentials;
pub mod chat;
pub mod private_chat;
pub mod message;
pub mod event;
pub mod event_category;
pub mod event_field;
pub mod preferred_field;
pub mod planned_activity;
pub mod friendship_request;
pub mod friendship;
pub mod group;
pub mod group_request;
pub mod participant;
pub mod review;
pub mod liked_review;

#[cfg(test)]
mod tests;

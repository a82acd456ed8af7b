//! Route tables. Everything is mounted under `/api`.
pub mod auth;
pub mod posts;

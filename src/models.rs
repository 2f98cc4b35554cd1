pub mod alerts;
pub mod auth;
pub mod inventory;
pub mod kardex;

// src/handlers.rs

pub mod alerts;
pub mod inventory;
pub mod kardex;

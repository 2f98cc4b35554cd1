pub mod alert_service;
pub mod auth;
pub mod inventory_service;
pub mod kardex_service;
pub mod reversal_service;
pub mod transfer_service;

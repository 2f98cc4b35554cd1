pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod movement_repo;
pub use movement_repo::MovementRepository;
pub mod alert_repo;
pub use alert_repo::AlertRepository;

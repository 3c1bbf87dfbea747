pub mod files;
pub mod health;
pub mod stats;
pub mod upload;

//! File metadata persistence.
//!
//! The lifecycle record store is behind the [`FileRepository`] trait with two
//! implementations: Postgres for deployments with `DATABASE_URL` set, and an
//! in-memory map for development and tests.

mod memory;
mod postgres;
mod repository;

pub use memory::MemoryFileRepository;
pub use postgres::PgFileRepository;
pub use repository::{FileRepository, StatusUpdate};

//! Runtime adapters used to host execution units.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;

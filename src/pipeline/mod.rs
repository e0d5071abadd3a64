//! Everything that turns the `geometry`/`dynamics` building blocks into a
//! steppable simulation: the broad-phase/octree glue, the impulse cache,
//! per-step tuning, and [`PhysicsWorld`] itself (§5, §6).

mod broad_phase;
pub mod cache_manager;
pub mod errors;
pub mod integration_parameters;
pub mod physics_world;

pub use cache_manager::CacheManager;
pub use errors::WorldError;
pub use integration_parameters::IntegrationParameters;
pub use physics_world::PhysicsWorld;

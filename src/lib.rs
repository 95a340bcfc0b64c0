/// Interactive assembly engine
///
/// Loads an assembly of fixtures and components, lets pointer, touch or
/// tracked controllers drag and turn components through force-limited
/// constraints, and reports when components sit where their links say
/// they belong.

pub mod assembly;
pub mod camera;
pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod events;
pub mod links;
pub mod mesh;
pub mod physics;
pub mod ray;
pub mod scale;
pub mod scene;
pub mod shape;
pub mod simulation;

pub use assembly::{Assembly, AssemblyBuilder, ObjectId, ObjectKind};
pub use config::EngineConfig;
pub use engine::{Engine, Mode};
pub use error::{AssemblyError, LifecycleError};
pub use events::{AssemblyEvent, EventKind};
pub use scale::TransformBridge;

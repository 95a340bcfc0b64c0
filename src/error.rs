use thiserror::Error;

/// Failure while building an assembly. No partial assembly survives one of these.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("geometry must have a name")]
    UnnamedGeometry,

    #[error("duplicate geometry `{0}`")]
    DuplicateGeometry(String),

    #[error("no geometry named `{0}`")]
    UnknownGeometry(String),

    #[error("duplicate object `{0}`")]
    DuplicateObject(String),

    #[error("object `{0}` has no mesh geometry")]
    MissingMeshes(String),

    #[error("object `{0}` has no body geometry")]
    MissingBodies(String),

    #[error("no object named `{0}`")]
    UnknownObject(String),

    #[error("exactly two objects must be linked, got {0}")]
    LinkArity(usize),

    #[error("cannot link `{0}` to itself")]
    SelfLink(String),

    #[error("cannot link two fixtures `{0}` and `{1}`")]
    FixtureLink(String, String),

    #[error("`{0}` and `{1}` are already linked")]
    AlreadyLinked(String, String),

    #[error("failed to parse OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Lifecycle call made in the wrong engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot change the loaded assembly while the simulation is running")]
    LoadWhileRunning,

    #[error("no assembly is loaded")]
    NotLoaded,
}

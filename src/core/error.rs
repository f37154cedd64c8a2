use thiserror::Error;

/// Programming errors raised while walking a relation graph.
///
/// A vetoed save is not an error: it travels through the persister as a
/// plain `Ok(false)`. Everything here means the graph or its declarations
/// are wrong, not that a hook declined.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Relation '{0}' expects a single related entity but holds a collection")]
    RelationShape(String),

    #[error("Relation '{0}' carries a descriptor inconsistent with its kind")]
    InvalidDescriptor(String),

    #[error("Relation '{0}' expects related type '{1}', found '{2}'")]
    RelationTarget(String, String, String),

    #[error("Relation '{0}' is not declared on entity type '{1}'")]
    UnknownRelation(String, String),

    #[error("Relation cycle detected through entity type '{0}'")]
    RelationCycle(String),

    #[error("Relation graph exceeds the depth limit of {0}")]
    DepthExceeded(usize),

    #[error("Entity of type '{0}' has no identifier after a successful save")]
    MissingIdentifier(String),

    #[error("Entity type '{0}' is not registered in the store")]
    UnknownEntityType(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

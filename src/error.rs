use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("quartiles need at least one observation")]
    DegenerateQuartileInput,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        EngineError::NotFound { entity, id }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalentMatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("Candidate not found: {0}")]
    CandidateNotFound(uuid::Uuid),

    #[error("Match not found: candidate {0}, job {1}")]
    MatchNotFound(uuid::Uuid, uuid::Uuid),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task already running: {0}")]
    AlreadyRunning(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TalentMatchError>;

/// Business-rule and storage failures surfaced by the game engine.
///
/// Every variant maps to one stable wire code; none of them is retried by
/// callers. Storage contention is retried inside the store before it ever
/// becomes a `Storage` error here.
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("user already has a pending or active match")]
    AlreadyInMatch,
    #[error("no match with this id")]
    NoSuchMatch,
    #[error("match id is not a valid uuid")]
    InvalidMatchId,
    #[error("only the players of a match may view it")]
    Forbidden,
    #[error("user has no active match")]
    NotInActiveMatch,
    #[error("all five answers already submitted")]
    AlreadyFinished,
    #[error("question pool holds {available} published questions, {required} needed")]
    InsufficientQuestions { available: usize, required: usize },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("corrupt stored record: {0}")]
    CorruptRecord(#[from] serde_json::Error),
    #[error("match question snapshot is incomplete")]
    CorruptSnapshot,
}

impl GameError {
    /// Stable code sent to clients, one per failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::AlreadyInMatch => "ALREADY_IN_MATCH",
            GameError::NoSuchMatch => "NO_SUCH_MATCH",
            GameError::InvalidMatchId => "INVALID_MATCH_ID",
            GameError::Forbidden => "FORBIDDEN",
            GameError::NotInActiveMatch => "NOT_IN_ACTIVE_MATCH",
            GameError::AlreadyFinished => "ALREADY_FINISHED",
            GameError::InsufficientQuestions { .. } => "INSUFFICIENT_QUESTIONS",
            GameError::Storage(_) | GameError::CorruptRecord(_) | GameError::CorruptSnapshot => {
                "SERVER_ERROR"
            }
        }
    }
}

use thiserror::Error;

/// Domain errors surfaced by the repositories. Route handlers map these
/// onto the HTTP contract; anything that reaches `Database` is an
/// unexpected persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("key already exists")]
    DuplicateKey,

    #[error("username or email already taken")]
    DuplicateAccount,

    #[error("invalid referral token")]
    InvalidToken,

    #[error("insufficient credits")]
    InsufficientCredits,

    #[error("device limit reached")]
    DeviceLimitReached,

    #[error("not the key owner")]
    NotOwner,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Collapses a sqlx error into `dup` when it is a unique-constraint
    /// violation, keeping the raw error otherwise.
    pub fn on_unique(err: sqlx::Error, dup: StoreError) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return dup;
            }
        }
        StoreError::Database(err)
    }
}

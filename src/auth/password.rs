use crate::error::AppError;

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hashes take tens of milliseconds; run them on the blocking pool so they
/// never stall the async runtime's worker threads.
pub async fn hash(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|_| AppError::InvariantViolation("password hashing task panicked".into()))?
        .map_err(|err| AppError::InvariantViolation(format!("bcrypt: {err}")))
}

pub async fn verify(password: String, hashed: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|_| AppError::InvariantViolation("password verification task panicked".into()))?
        .map_err(|err| AppError::InvariantViolation(format!("bcrypt: {err}")))
}

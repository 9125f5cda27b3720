pub mod jwt;
pub mod middleware;
pub mod password;

pub use middleware::AuthUser;

use crate::error::AppError;
use crate::store::Store;

/// Verifies `name`/`password` against the `auth` table and returns the
/// participant id on success. Deliberately returns the same error for an
/// unknown user and a wrong password, as
/// `original_source/auth.py::authenticate_user` does, so a client can't use
/// the error to enumerate usernames.
pub async fn authenticate(store: &Store, name: &str, password: &str) -> Result<i64, AppError> {
    let Some((participant_id, hashed_password)) = store.find_auth_by_name(name).await? else {
        return Err(AppError::BadCredentials);
    };

    if password::verify(password.to_string(), hashed_password).await? {
        Ok(participant_id)
    } else {
        Err(AppError::BadCredentials)
    }
}

/// Registers a new participant with a starting balance, hashing the
/// password first. Surfaces a `Conflict` if the name is already taken.
pub async fn signup(
    store: &Store,
    name: &str,
    password: &str,
    starting_balance: i64,
) -> Result<i64, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }

    let hashed = password::hash(password.to_string()).await?;

    store
        .signup(name, &hashed, starting_balance)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(format!("participant '{name}' already exists"))
            }
            _ => AppError::TransientStore(err),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signup_then_authenticate_round_trips() {
        let store = Store::connect(":memory:").await.unwrap();
        let id = signup(&store, "rik", "hunter2", 100).await.unwrap();

        let authenticated = authenticate(&store, "rik", "hunter2").await.unwrap();
        assert_eq!(authenticated, id);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let store = Store::connect(":memory:").await.unwrap();
        signup(&store, "rik", "hunter2", 100).await.unwrap();

        let result = authenticate(&store, "rik", "wrong").await;
        assert!(matches!(result, Err(AppError::BadCredentials)));
    }

    #[tokio::test]
    async fn unknown_user_gets_the_same_error_as_a_wrong_password() {
        let store = Store::connect(":memory:").await.unwrap();
        let result = authenticate(&store, "nobody", "whatever").await;
        assert!(matches!(result, Err(AppError::BadCredentials)));
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict() {
        let store = Store::connect(":memory:").await.unwrap();
        signup(&store, "rik", "hunter2", 100).await.unwrap();

        let result = signup(&store, "rik", "different-password", 100).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn empty_name_is_rejected_before_touching_the_store() {
        let store = Store::connect(":memory:").await.unwrap();
        let result = signup(&store, "   ", "hunter2", 100).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_password_is_rejected() {
        let store = Store::connect(":memory:").await.unwrap();
        let result = signup(&store, "rik", "", 100).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

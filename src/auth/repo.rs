use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub username: String,
    pub password_hash: String,
}

impl User {
    pub async fn find(db: &SqlitePool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT username, password_hash
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await
    }

    /// Fails with a unique-constraint violation if the username exists; the
    /// auth flow only calls this after a failed lookup, so hitting that is a
    /// lost registration race.
    pub async fn create(db: &SqlitePool, username: &str, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        crate::db::test_pool().await
    }

    #[tokio::test]
    async fn create_then_find() {
        let db = pool().await;
        User::create(&db, "alice", "hash-1").await.unwrap();

        let user = User::find(&db, "alice").await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password_hash, "hash-1");

        assert!(User::find(&db, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let db = pool().await;
        User::create(&db, "alice", "hash-1").await.unwrap();

        let err = User::create(&db, "alice", "hash-2").await.unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => {
                assert!(matches!(
                    db_err.kind(),
                    sqlx::error::ErrorKind::UniqueViolation
                ));
            }
            other => panic!("expected database error, got {other:?}"),
        }

        // the original row is untouched
        let user = User::find(&db, "alice").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-1");
    }
}

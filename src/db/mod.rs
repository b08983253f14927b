pub mod mock_db;
pub mod organization_repository;
pub mod postgres_organization_repository;
pub mod postgres_user_repository;
pub mod user_repository;

/// Postgres signals a violated unique constraint with SQLSTATE 23505. The
/// write path treats it as the same Conflict the pre-check would have
/// produced; the constraint is the correctness backstop for concurrent
/// writers, the pre-check only the fast path.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code == "23505";
        }
    }
    false
}

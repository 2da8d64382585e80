use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserPatch, UserRow};
use crate::store::PgStore;

const USER_COLUMNS: &str = "id, email, display_name, password_hash, role, is_admin, \
                            school_code, has_subscription, created_at";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Returns `None` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn list_users(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> anyhow::Result<Option<User>>;
    /// Returns `false` when no user has that email.
    async fn set_subscription_by_email(&self, email: &str, active: bool) -> anyhow::Result<bool>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, display_name, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.display_name)
        .bind(&new.password_hash)
        .fetch_optional(&self.pool)
        .await
        .context("insert user")?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("list users")?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> anyhow::Result<Option<User>> {
        let (set_school, school_code) = match patch.school_code {
            Some(code) => (true, code),
            None => (false, None),
        };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                display_name     = COALESCE($2, display_name),
                role             = COALESCE($3, role),
                is_admin         = COALESCE($4, is_admin),
                school_code      = CASE WHEN $5 THEN $6 ELSE school_code END,
                has_subscription = COALESCE($7, has_subscription)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.display_name)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.is_admin)
        .bind(set_school)
        .bind(school_code)
        .bind(patch.has_subscription)
        .fetch_optional(&self.pool)
        .await
        .context("update user")?;
        row.map(User::try_from).transpose()
    }

    async fn set_subscription_by_email(&self, email: &str, active: bool) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET has_subscription = $2 WHERE email = $1")
            .bind(email)
            .bind(active)
            .execute(&self.pool)
            .await
            .context("set subscription")?;
        Ok(res.rows_affected() > 0)
    }
}

use sqlx::sqlite::SqlitePool;

/// Store for user accounts and their refresh slot.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// An account as seen by the rest of the application.
/// Never carries the password hash or the stored refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: String,
}

/// Account together with its secrets, only handed to credential and session code.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account: Account,
    pub password_hash: String,
    pub refresh_token: Option<String>,
}

/// Fields for creating an account.
pub struct NewAccount<'a> {
    pub uuid: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    uuid: String,
    username: String,
    email: String,
    full_name: String,
    created_at: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRecordRow {
    id: i64,
    uuid: String,
    username: String,
    email: String,
    full_name: String,
    created_at: String,
    password_hash: String,
    refresh_token: Option<String>,
}

impl From<AccountRecordRow> for AccountRecord {
    fn from(row: AccountRecordRow) -> Self {
        Self {
            account: Account {
                id: row.id,
                uuid: row.uuid,
                username: row.username,
                email: row.email,
                full_name: row.full_name,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
            refresh_token: row.refresh_token,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new account. Returns the account ID.
    pub async fn create(&self, new: &NewAccount<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, username, email, full_name, password_hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.uuid)
        .bind(new.username)
        .bind(new.email)
        .bind(new.full_name)
        .bind(new.password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get an account by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, username, email, full_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Get an account by its public UUID (the token subject).
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, username, email, full_name, created_at FROM users WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Look up an account by username or email, including its secrets.
    /// Usernames and emails are unique across the table, so at most one row matches.
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AccountRecord>, sqlx::Error> {
        let row: Option<AccountRecordRow> = sqlx::query_as(
            "SELECT id, uuid, username, email, full_name, created_at, password_hash, refresh_token
             FROM users WHERE username = ? OR email = ? LIMIT 1",
        )
        .bind(identifier)
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AccountRecord::from))
    }

    /// Get an account by UUID, including its secrets.
    pub async fn get_record_by_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<AccountRecord>, sqlx::Error> {
        let row: Option<AccountRecordRow> = sqlx::query_as(
            "SELECT id, uuid, username, email, full_name, created_at, password_hash, refresh_token
             FROM users WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AccountRecord::from))
    }

    /// Get the password hash for an account.
    pub async fn get_password_hash(&self, id: i64) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Check whether a username or email is already used by any account.
    pub async fn is_identifier_taken(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Check whether an email belongs to an account other than `id`.
    pub async fn is_email_taken_by_other(&self, email: &str, id: i64) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Read the current refresh slot.
    ///
    /// Rotation reads the slot through `get_record_by_uuid`; this is the
    /// direct lookup used by tests to inspect stored state.
    pub async fn get_refresh_token(&self, id: i64) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT refresh_token FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|r| r.0))
    }

    /// Overwrite the refresh slot. Any previously stored token stops being valid.
    pub async fn set_refresh_token(&self, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the refresh slot only if it still holds `expected`.
    ///
    /// The compare and the write are one statement, so of several callers
    /// racing on the same `expected` value exactly one sees `true`.
    pub async fn swap_refresh_token(
        &self,
        id: i64,
        expected: &str,
        new: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ? AND refresh_token = ?")
                .bind(new)
                .bind(id)
                .bind(expected)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Empty the refresh slot (logout).
    pub async fn clear_refresh_token(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the mutable profile fields.
    pub async fn update_details(
        &self,
        id: i64,
        full_name: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET full_name = ?, email = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(full_name)
        .bind(email)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored password hash.
    pub async fn update_password_hash(&self, id: i64, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an account by ID.
    ///
    /// No route deletes accounts; tests use this to exercise tokens that
    /// outlive their account.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

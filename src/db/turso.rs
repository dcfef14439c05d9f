use crate::db::traits::{UserDirectory, UserUpdate};
use crate::types::{AppError, DirectoryUser, IdentityUser, Result, Role};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Builder, Connection, Database, Row};

const USER_COLUMNS: &str =
    "id, email, full_name, role, is_active, created_at, updated_at, last_login_at";

/// libsql-backed store for users, credentials, settings and the activity log.
///
/// Holds a single connection for its whole life; with `:memory:` every new
/// connection would open a separate, empty database.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    /// Opens (or creates) a SQLite database file.
    pub async fn new_local(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;
        Self::from_database(db).await
    }

    /// Opens an ephemeral in-memory database.
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;
        Ok(client)
    }

    async fn initialize_schema(&self) -> Result<()> {
        // Users table
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    email TEXT UNIQUE NOT NULL,
                    full_name TEXT NOT NULL,
                    role TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    last_login_at INTEGER
                )",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        // Credentials for the local identity provider
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS credentials (
                    email TEXT PRIMARY KEY,
                    password_hash TEXT NOT NULL,
                    display_name TEXT,
                    created_at INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to create credentials table: {}", e))
            })?;

        // System settings table
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS system_settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    description TEXT,
                    is_public INTEGER NOT NULL DEFAULT 0,
                    updated_by TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    FOREIGN KEY (updated_by) REFERENCES users(id)
                )",
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to create system_settings table: {}", e))
            })?;

        // Activity log table
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS activity_logs (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    activity_type TEXT NOT NULL,
                    entity_type TEXT NOT NULL,
                    entity_id TEXT NOT NULL,
                    description TEXT NOT NULL,
                    metadata TEXT NOT NULL,
                    ip_address TEXT,
                    user_agent TEXT,
                    created_at INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to create activity_logs table: {}", e))
            })?;

        Ok(())
    }

    // User operations
    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        full_name: &str,
        role: Role,
    ) -> Result<DirectoryUser> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO users (id, email, full_name, role, is_active, created_at, updated_at, last_login_at)
                 VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
                (id, email, full_name, role.as_str(), now, now, now),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;

        Ok(DirectoryUser {
            id: id.to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: Some(now),
        })
    }

    /// Looks up a user by email regardless of the active flag.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<DirectoryUser>> {
        self.query_user(
            &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
            email,
        )
        .await
    }

    async fn query_user(&self, sql: &str, param: &str) -> Result<Option<DirectoryUser>> {
        let mut rows = self
            .conn
            .query(sql, [param])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => user_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn touch_login(&self, id: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn
            .execute(
                "UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?",
                (now, now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update user activity: {}", e)))?;
        Ok(())
    }

    // Credential operations
    pub async fn store_credentials(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT OR REPLACE INTO credentials (email, password_hash, display_name, created_at)
                 VALUES (?, ?, ?, ?)",
                (email, password_hash, display_name, now),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to store credentials: {}", e)))?;

        Ok(())
    }

    /// Returns `(password_hash, display_name)` for `email`.
    pub async fn get_credentials(&self, email: &str) -> Result<Option<(String, Option<String>)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT password_hash, display_name FROM credentials WHERE email = ?",
                [email],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query credentials: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some((
                row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
                row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
            ))),
            None => Ok(None),
        }
    }

    // Settings operations
    pub async fn list_settings(&self) -> Result<Vec<SettingRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT s.key, s.value, s.description, s.is_public, s.updated_by,
                        s.created_at, s.updated_at, u.full_name
                 FROM system_settings s
                 LEFT JOIN users u ON s.updated_by = u.id
                 ORDER BY s.key",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query settings: {}", e)))?;

        let mut settings = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            settings.push(setting_from_row(&row, true)?);
        }

        Ok(settings)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<SettingRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key, value, description, is_public, updated_by, created_at, updated_at
                 FROM system_settings WHERE key = ?",
                [key],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query setting: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => setting_from_row(&row, false).map(Some),
            None => Ok(None),
        }
    }

    pub async fn existing_setting_keys(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT key FROM system_settings", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to query settings: {}", e)))?;

        let mut keys = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            keys.push(row.get(0).map_err(|e| AppError::Database(e.to_string()))?);
        }
        Ok(keys)
    }

    pub async fn upsert_setting(
        &self,
        key: &str,
        value_json: &str,
        description: Option<&str>,
        is_public: bool,
        updated_by: Option<&str>,
    ) -> Result<SettingRow> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO system_settings (key, value, description, is_public, updated_by, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    description = excluded.description,
                    is_public = excluded.is_public,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at",
                (key, value_json, description, is_public as i64, updated_by, now, now),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to store setting: {}", e)))?;

        self.get_setting(key)
            .await?
            .ok_or_else(|| AppError::Database(format!("Setting {} vanished after write", key)))
    }

    pub async fn update_setting(
        &self,
        key: &str,
        value_json: &str,
        description: Option<&str>,
        is_public: Option<bool>,
        updated_by: Option<&str>,
    ) -> Result<Option<SettingRow>> {
        let now = Utc::now().timestamp();

        // COALESCE keeps the stored column when the new value is NULL.
        let changed = self
            .conn
            .execute(
                "UPDATE system_settings SET
                    value = ?,
                    description = COALESCE(?, description),
                    is_public = COALESCE(?, is_public),
                    updated_by = COALESCE(?, updated_by),
                    updated_at = ?
                 WHERE key = ?",
                (
                    value_json,
                    description,
                    is_public.map(|p| p as i64),
                    updated_by,
                    now,
                    key,
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update setting: {}", e)))?;

        if changed == 0 {
            return Ok(None);
        }
        self.get_setting(key).await
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM system_settings WHERE key = ?", [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete setting: {}", e)))?;
        Ok(changed > 0)
    }

    // Activity log operations
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_activity(
        &self,
        user_id: &str,
        activity_type: &str,
        entity_type: &str,
        entity_id: &str,
        description: &str,
        metadata: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<()> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO activity_logs
                 (id, user_id, activity_type, entity_type, entity_id, description, metadata, ip_address, user_agent, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    id,
                    user_id,
                    activity_type,
                    entity_type,
                    entity_id,
                    description,
                    metadata,
                    ip_address,
                    user_agent,
                    now,
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to log activity: {}", e)))?;

        Ok(())
    }

    pub async fn list_activity(&self, user_id: &str) -> Result<Vec<ActivityRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT activity_type, entity_id, description, ip_address, user_agent, created_at
                 FROM activity_logs WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
                [user_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query activity: {}", e)))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            entries.push(ActivityRow {
                activity_type: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
                entity_id: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
                description: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
                ip_address: row.get(3).map_err(|e| AppError::Database(e.to_string()))?,
                user_agent: row.get(4).map_err(|e| AppError::Database(e.to_string()))?,
                created_at: row.get(5).map_err(|e| AppError::Database(e.to_string()))?,
            });
        }

        Ok(entries)
    }
}

#[async_trait]
impl UserDirectory for TursoClient {
    async fn sync_user(
        &self,
        identity: &IdentityUser,
        super_admin_email: Option<&str>,
    ) -> Result<DirectoryUser> {
        let email = identity
            .email
            .clone()
            .unwrap_or_else(|| identity.username.clone());

        if let Some(mut existing) = self.find_user_by_email(&email).await? {
            self.touch_login(&existing.id).await?;
            let now = Utc::now().timestamp();
            existing.last_login_at = Some(now);
            existing.updated_at = now;
            return Ok(existing);
        }

        let full_name = identity
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(email.clone()).filter(|e| !e.is_empty()))
            .unwrap_or_else(|| "Unknown User".to_string());
        let role = if super_admin_email.is_some_and(|admin| admin.eq_ignore_ascii_case(&email)) {
            Role::SuperAdmin
        } else {
            Role::User
        };

        let id = uuid::Uuid::new_v4().to_string();
        let user = self.create_user(&id, &email, &full_name, role).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "created directory user on first login");
        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<DirectoryUser>> {
        self.query_user(
            &format!(
                "SELECT {} FROM users WHERE id = ? AND is_active = 1",
                USER_COLUMNS
            ),
            id,
        )
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<DirectoryUser>> {
        self.query_user(
            &format!(
                "SELECT {} FROM users WHERE email = ? AND is_active = 1",
                USER_COLUMNS
            ),
            email,
        )
        .await
    }

    async fn update_user_activity(&self, id: &str) {
        if let Err(e) = self.touch_login(id).await {
            tracing::warn!(user_id = %id, error = %e, "failed to record user activity");
        }
    }

    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS),
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query users: {}", e)))?;

        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            users.push(user_from_row(&row)?);
        }
        Ok(users)
    }

    async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<Option<DirectoryUser>> {
        let now = Utc::now().timestamp();

        let changed = self
            .conn
            .execute(
                "UPDATE users SET
                    role = COALESCE(?, role),
                    is_active = COALESCE(?, is_active),
                    updated_at = ?
                 WHERE id = ?",
                (
                    update.role.map(|r| r.as_str()),
                    update.is_active.map(|a| a as i64),
                    now,
                    id,
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update user: {}", e)))?;

        if changed == 0 {
            return Ok(None);
        }

        self.query_user(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            id,
        )
        .await
    }
}

fn user_from_row(row: &Row) -> Result<DirectoryUser> {
    let role: String = row.get(3).map_err(|e| AppError::Database(e.to_string()))?;
    let is_active: i64 = row.get(4).map_err(|e| AppError::Database(e.to_string()))?;

    Ok(DirectoryUser {
        id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
        email: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
        full_name: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
        role: role
            .parse()
            .map_err(|_| AppError::Database(format!("Unknown role in users table: {}", role)))?,
        is_active: is_active != 0,
        created_at: row.get(5).map_err(|e| AppError::Database(e.to_string()))?,
        updated_at: row.get(6).map_err(|e| AppError::Database(e.to_string()))?,
        last_login_at: row.get(7).map_err(|e| AppError::Database(e.to_string()))?,
    })
}

fn setting_from_row(row: &Row, with_updater_name: bool) -> Result<SettingRow> {
    let is_public: i64 = row.get(3).map_err(|e| AppError::Database(e.to_string()))?;

    Ok(SettingRow {
        key: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
        value: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
        description: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
        is_public: is_public != 0,
        updated_by: row.get(4).map_err(|e| AppError::Database(e.to_string()))?,
        created_at: row.get(5).map_err(|e| AppError::Database(e.to_string()))?,
        updated_at: row.get(6).map_err(|e| AppError::Database(e.to_string()))?,
        updated_by_name: if with_updater_name {
            row.get(7).map_err(|e| AppError::Database(e.to_string()))?
        } else {
            None
        },
    })
}

/// Raw `system_settings` row; `value` is JSON text.
#[derive(Debug, Clone)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub updated_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub updated_by_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub activity_type: String,
    pub entity_id: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str, name: Option<&str>) -> IdentityUser {
        IdentityUser {
            username: email.to_string(),
            email: Some(email.to_string()),
            name: name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_sync_creates_then_reuses() {
        let db = TursoClient::new_memory().await.unwrap();

        let first = db
            .sync_user(&identity("a@example.com", Some("Ann")), None)
            .await
            .unwrap();
        assert_eq!(first.role, Role::User);
        assert_eq!(first.full_name, "Ann");

        let second = db
            .sync_user(&identity("a@example.com", Some("Other")), None)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.full_name, "Ann");
    }

    #[tokio::test]
    async fn test_sync_assigns_super_admin_by_email() {
        let db = TursoClient::new_memory().await.unwrap();

        let user = db
            .sync_user(&identity("Root@Example.com", None), Some("root@example.com"))
            .await
            .unwrap();

        assert_eq!(user.role, Role::SuperAdmin);
        assert_eq!(user.full_name, "Root@Example.com");
    }

    #[tokio::test]
    async fn test_inactive_user_hidden_from_lookups() {
        let db = TursoClient::new_memory().await.unwrap();
        let user = db
            .create_user("u-1", "b@example.com", "Bee", Role::Admin)
            .await
            .unwrap();

        db.update_user(
            &user.id,
            &UserUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(db.get_user_by_id("u-1").await.unwrap().is_none());
        assert!(db.get_user_by_email("b@example.com").await.unwrap().is_none());
        assert!(db.find_user_by_email("b@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_user_role() {
        let db = TursoClient::new_memory().await.unwrap();
        db.create_user("u-2", "c@example.com", "Cee", Role::SuperAdmin)
            .await
            .unwrap();

        let updated = db
            .update_user(
                "u-2",
                &UserUpdate {
                    role: Some(Role::User),
                    is_active: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.role, Role::User);
        assert!(updated.is_active);
        assert!(db
            .update_user("missing", &UserUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_setting_upsert_update_delete() {
        let db = TursoClient::new_memory().await.unwrap();

        let row = db
            .upsert_setting("default_llm_model", "\"m1\"", Some("model"), false, None)
            .await
            .unwrap();
        assert_eq!(row.value, "\"m1\"");

        let row = db
            .update_setting("default_llm_model", "\"m2\"", None, Some(true), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.value, "\"m2\"");
        assert_eq!(row.description.as_deref(), Some("model"));
        assert!(row.is_public);

        assert!(db
            .update_setting("embedding_model", "\"x\"", None, None, None)
            .await
            .unwrap()
            .is_none());

        assert!(db.delete_setting("default_llm_model").await.unwrap());
        assert!(!db.delete_setting("default_llm_model").await.unwrap());
    }
}

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use crate::user::auth::{
    AuthToken, AuthTokenValue, HsoundHasher, PasswordResetToken, UsernamePasswordCredentials,
};
use crate::user::user_models::User;
use crate::user::user_store::{PasswordResetStore, UserAuthTokenStore, UserStore};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    str::FromStr,
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::info;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_username", "username")],
};
const USER_PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_auth_token_value", "value")],
};
const PASSWORD_RESET_TOKEN_TABLE_V_0: Table = Table {
    name: "password_reset_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("used", &SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[("idx_password_reset_token_value", "value")],
};

const SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
        PASSWORD_RESET_TOKEN_TABLE_V_0,
    ],
    migration: None,
}];

fn to_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0) as i64
}

fn from_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_file_path: P) -> Result<Self> {
        let is_new = !db_file_path.as_ref().exists();
        let conn = Connection::open(&db_file_path)
            .with_context(|| format!("Could not open user db at {:?}", db_file_path.as_ref()))?;
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;

        let latest = SCHEMAS
            .last()
            .context("No user store schema versions defined")?;

        if is_new {
            info!("Creating new user database at {:?}", db_file_path.as_ref());
            latest.create(&conn)?;
        } else {
            let stored = match VersionedSchema::stored_version(&conn)? {
                Some(version) => version,
                None => bail!(
                    "User db at {:?} exists but carries no schema version",
                    db_file_path.as_ref()
                ),
            };
            if stored > latest.version {
                bail!(
                    "User db schema version {} is newer than this build supports ({})",
                    stored,
                    latest.version
                );
            }
            for schema in SCHEMAS.iter().filter(|s| s.version > stored) {
                let migration = schema
                    .migration
                    .with_context(|| format!("No migration to schema version {}", schema.version))?;
                info!("Migrating user db to schema version {}", schema.version);
                migration(&conn)?;
            }
            latest.validate(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get::<_, i64>(0)? as usize,
            username: row.get(1)?,
            email: row.get(2)?,
            created: from_secs(row.get(3)?),
        })
    }

    fn row_to_auth_token(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get::<_, i64>(0)? as usize,
            value: AuthTokenValue(row.get(1)?),
            created: from_secs(row.get(2)?),
            last_used: row.get::<_, Option<i64>>(3)?.map(from_secs),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, username: &str, email: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (username, email) VALUES (?1, ?2)",
            params![username, email],
        )
        .with_context(|| format!("Could not create user {}", username))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, username, email, created FROM user WHERE id = ?1",
                params![user_id as i64],
                Self::row_to_user,
            )
            .optional()?)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, username, email, created FROM user WHERE username = ?1",
                params![username],
                Self::row_to_user,
            )
            .optional()?)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, username, email, created FROM user WHERE email = ?1",
                params![email],
                Self::row_to_user,
            )
            .optional()?)
    }

    fn get_password_credentials(
        &self,
        user_id: usize,
    ) -> Result<Option<UsernamePasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, salt, hash, hasher, created, last_used
                 FROM user_password_credentials WHERE user_id = ?1",
                params![user_id as i64],
                |row| {
                    let hasher_name: String = row.get(3)?;
                    Ok(UsernamePasswordCredentials {
                        user_id: row.get::<_, i64>(0)? as usize,
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                        hasher: HsoundHasher::from_str(&hasher_name).unwrap_or(HsoundHasher::Argon2),
                        created: from_secs(row.get(4)?),
                        last_used: row.get::<_, Option<i64>>(5)?.map(from_secs),
                    })
                },
            )
            .optional()?)
    }

    fn set_password_credentials(&self, credentials: UsernamePasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created, last_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                salt = excluded.salt,
                hash = excluded.hash,
                hasher = excluded.hasher,
                created = excluded.created,
                last_used = excluded.last_used",
            params![
                credentials.user_id as i64,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                to_secs(credentials.created),
                credentials.last_used.map(to_secs),
            ],
        )?;
        Ok(())
    }

    fn touch_password_credentials(&self, user_id: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_password_credentials SET last_used = ?1 WHERE user_id = ?2",
            params![to_secs(SystemTime::now()), user_id as i64],
        )?;
        Ok(())
    }

    fn all_usernames(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT username FROM user ORDER BY id")?;
        let usernames = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(usernames)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                Self::row_to_auth_token,
            )
            .optional()?)
    }

    fn add_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id as i64,
                token.value.0,
                to_secs(token.created),
                token.last_used.map(to_secs),
            ],
        )?;
        Ok(())
    }

    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let existing = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                Self::row_to_auth_token,
            )
            .optional()?;
        if existing.is_some() {
            conn.execute("DELETE FROM auth_token WHERE value = ?1", params![value.0])?;
        }
        Ok(existing)
    }

    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![to_secs(SystemTime::now()), value.0],
        )?;
        Ok(())
    }
}

impl PasswordResetStore for SqliteUserStore {
    fn add_reset_token(&self, token: PasswordResetToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO password_reset_token (user_id, value, created, used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id as i64,
                token.value,
                to_secs(token.created),
                token.used as i64,
            ],
        )?;
        Ok(())
    }

    fn get_reset_token(&self, value: &str) -> Result<Option<PasswordResetToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, used FROM password_reset_token WHERE value = ?1",
                params![value],
                |row| {
                    Ok(PasswordResetToken {
                        user_id: row.get::<_, i64>(0)? as usize,
                        value: row.get(1)?,
                        created: from_secs(row.get(2)?),
                        used: row.get::<_, i64>(3)? != 0,
                    })
                },
            )
            .optional()?)
    }

    fn mark_reset_token_used(&self, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE password_reset_token SET used = 1 WHERE value = ?1",
            params![value],
        )?;
        Ok(())
    }
}

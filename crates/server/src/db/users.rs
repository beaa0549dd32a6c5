//! User repository for database operations.
//!
//! Queries are runtime-checked (`sqlx::query_as`) so the same SQL serves
//! both backends; rows are decoded into [`UserRow`] and validated into the
//! domain [`User`].

use chrono::{DateTime, Utc};

use duct_order_core::{Email, PhoneNumber, Role, UserId};

use super::{Database, RepositoryError, map_unique_violation};
use crate::models::{NewUser, User};

/// Prefix a `WHERE`/`ORDER BY` tail with the full user column list.
macro_rules! select_user {
    ($tail:literal) => {
        concat!(
            "SELECT id, email, phone, password_hash, first_name, last_name, google_id, role, \
             created_at, updated_at FROM users ",
            $tail
        )
    };
}

/// Raw `users` row.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    google_id: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = UserId::parse(&row.id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid user id in database: {e}"))
        })?;
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;
        let phone = row
            .phone
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;
        let role = row.role.parse::<Role>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id,
            email,
            phone,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            google_id: row.google_id,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by(select_user!("WHERE id = $1"), id.to_string())
            .await
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by(select_user!("WHERE email = $1"), email.to_string())
            .await
    }

    /// Get a user by their phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by(select_user!("WHERE phone = $1"), phone.to_string())
            .await
    }

    /// Get a user by their Google subject identifier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by(select_user!("WHERE google_id = $1"), google_id.to_string())
            .await
    }

    async fn fetch_one_by(
        &self,
        sql: &'static str,
        key: String,
    ) -> Result<Option<User>, RepositoryError> {
        let row = on_pool!(self.db, pool => {
            sqlx::query_as::<_, UserRow>(sql)
                .bind(key)
                .fetch_optional(pool)
                .await?
        });
        row.map(User::try_from).transpose()
    }

    /// Create a new user with role `user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email, phone or Google ID
    /// already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let now = Utc::now();
        let user = User {
            id: UserId::new_v4(),
            email: new_user.email,
            phone: new_user.phone,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            google_id: new_user.google_id,
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        self.insert(&user, false).await?;
        Ok(user)
    }

    /// Insert a fully-formed user unless its ID, email, phone or Google ID
    /// is already taken. Used by backup import.
    ///
    /// Returns `true` if the row was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_if_absent(&self, user: &User) -> Result<bool, RepositoryError> {
        self.insert(user, true).await
    }

    async fn insert(&self, user: &User, skip_conflicts: bool) -> Result<bool, RepositoryError> {
        let sql = if skip_conflicts {
            "INSERT INTO users (id, email, phone, password_hash, first_name, last_name, \
             google_id, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT DO NOTHING"
        } else {
            "INSERT INTO users (id, email, phone, password_hash, first_name, last_name, \
             google_id, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        };

        let result = on_pool!(self.db, pool => {
            sqlx::query(sql)
                .bind(user.id.to_string())
                .bind(user.email.as_ref().map(Email::as_str))
                .bind(user.phone.as_ref().map(PhoneNumber::as_str))
                .bind(user.password_hash.as_deref())
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.google_id.as_deref())
                .bind(user.role.as_str())
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(pool)
                .await
                .map(|r| r.rows_affected())
        })
        .map_err(map_unique_violation)?;

        Ok(result > 0)
    }

    /// Attach a Google account to an existing user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the Google ID is linked elsewhere.
    pub async fn link_google_id(&self, id: UserId, google_id: &str) -> Result<(), RepositoryError> {
        let affected = on_pool!(self.db, pool => {
            sqlx::query("UPDATE users SET google_id = $1, updated_at = $2 WHERE id = $3")
                .bind(google_id)
                .bind(Utc::now())
                .bind(id.to_string())
                .execute(pool)
                .await
                .map(|r| r.rows_affected())
        })
        .map_err(map_unique_violation)?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let affected = on_pool!(self.db, pool => {
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id.to_string())
                .execute(pool)
                .await?
                .rows_affected()
        });

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Change a user's role and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let affected = on_pool!(self.db, pool => {
            sqlx::query("UPDATE users SET role = $1, updated_at = $2 WHERE id = $3")
                .bind(role.as_str())
                .bind(Utc::now())
                .bind(id.to_string())
                .execute(pool)
                .await?
                .rows_affected()
        });

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any stored row is invalid.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = on_pool!(self.db, pool => {
            sqlx::query_as::<_, UserRow>(select_user!("ORDER BY created_at DESC, id"))
                .fetch_all(pool)
                .await?
        });
        rows.into_iter().map(User::try_from).collect()
    }

    /// Number of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = on_pool!(self.db, pool => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?
        });
        Ok(count)
    }

    /// Delete a user. Their reset tokens go with them; their analytics
    /// events are kept as guest events.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let affected = on_pool!(self.db, pool => {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id.to_string())
                .execute(pool)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

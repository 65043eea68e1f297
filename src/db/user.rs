use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Roles a principal can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Stored name, also used as the authority string.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

/// A stored principal.
#[derive(Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user with the given roles. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[Role],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        let id = result.last_insert_rowid();

        for role in roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, name) VALUES (?, ?)")
                .bind(id)
                .bind(role.authority())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Get a user and their roles by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM user_roles WHERE user_id = ? ORDER BY name")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await?;

        let mut roles = Vec::with_capacity(names.len());
        for (name,) in names {
            match Role::parse(&name) {
                Some(role) => roles.push(role),
                None => tracing::warn!(user_id = row.id, role = %name, "Ignoring unknown role"),
            }
        }
        roles.sort();

        Ok(Some(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            roles,
        }))
    }

    /// Grant a role. Returns false if the user already had it.
    pub async fn add_role(&self, id: i64, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, name) VALUES (?, ?)")
            .bind(id)
            .bind(role.authority())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every role from a user. Returns the number removed.
    pub async fn clear_roles(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a user by ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

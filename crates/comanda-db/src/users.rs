//! User accounts and password hashing.
//!
//! Hashes are `salt$hex(sha256(salt || password))`. Not a KDF, but the
//! accounts here gate a kitchen dashboard on a LAN, not internet banking.

use anyhow::{Context, Result};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};

const SALT_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub active: bool,
}

pub fn hash_password(password: &str) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{}${}", salt, hex::encode(hasher.finalize()))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize()) == digest
}

pub async fn fetch_user_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query(
        r#"
        select id, username, password_hash, role, active
        from users
        where username = $1 and active
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("fetch_user_by_username failed")?;

    row.map(|r| {
        Ok(UserRow {
            id: r.try_get("id")?,
            username: r.try_get("username")?,
            password_hash: r.try_get("password_hash")?,
            role: r.try_get("role")?,
            active: r.try_get("active")?,
        })
    })
    .transpose()
}

pub async fn insert_user(pool: &PgPool, username: &str, password: &str, role: &str) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into users (username, password_hash, role)
        values ($1, $2, $3)
        returning id
        "#,
    )
    .bind(username)
    .bind(hash_password(password))
    .bind(role)
    .fetch_one(pool)
    .await
    .context("insert_user failed")?;

    Ok(id)
}

/// Seed the two built-in accounts on first boot. Existing rows are kept,
/// including any password changes an operator has made.
pub async fn seed_default_users(pool: &PgPool) -> Result<()> {
    for (username, password, role) in [
        ("admin", "admin123", "admin"),
        ("cliente", "cliente123", "customer"),
    ] {
        let res = sqlx::query(
            r#"
            insert into users (username, password_hash, role)
            values ($1, $2, $3)
            on conflict (username) do nothing
            "#,
        )
        .bind(username)
        .bind(hash_password(password))
        .bind(role)
        .execute(pool)
        .await
        .with_context(|| format!("seeding user {username} failed"))?;

        if res.rows_affected() > 0 {
            tracing::info!(username, role, "seeded default user");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let stored = hash_password("admin123");
        assert!(verify_password("admin123", &stored));
        assert!(!verify_password("admin124", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("admin123");
        let b = hash_password("admin123");
        assert_ne!(a, b);
    }

    #[test]
    fn stored_shape_is_salt_dollar_digest() {
        let stored = hash_password("x");
        let (salt, digest) = stored.split_once('$').unwrap();
        assert_eq!(salt.len(), SALT_LEN);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("x", "no-separator-here"));
        assert!(!verify_password("x", ""));
    }
}

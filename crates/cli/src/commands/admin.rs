//! Admin user management commands.
//!
//! Admin keys are only ever shown here, once, at creation or rotation. The
//! database keeps the Argon2 hash.

use emporium_admin::db::{AdminUserRepository, RepositoryError};
use emporium_admin::services::auth::{generate_admin_key, hash_admin_key};
use emporium_core::Email;

use super::{CliError, connect};

fn parse_email(email: &str) -> Result<Email, CliError> {
    Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))
}

/// Show a freshly issued key. Goes to stdout so it survives any log filter.
#[allow(clippy::print_stdout)]
fn print_key(email: &Email, key: &str) {
    println!("Admin key for {email}: {key}");
    println!("Store it now; it cannot be shown again.");
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns an error if the email is invalid, the admin already exists or
/// the database is unreachable.
pub async fn create(email: &str) -> Result<(), CliError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    let key = generate_admin_key();
    let hash = hash_admin_key(&key)?;

    let admin = AdminUserRepository::new(&pool)
        .create(&email, &hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(admin_id = %admin.id, email = %admin.email, "Admin user created");
    print_key(&email, &key);
    Ok(())
}

/// Replace an admin's key.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such admin exists or the
/// database is unreachable.
pub async fn rotate_key(email: &str) -> Result<(), CliError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    let key = generate_admin_key();
    let hash = hash_admin_key(&key)?;

    AdminUserRepository::new(&pool)
        .set_key_hash(&email, &hash)
        .await
        .map_err(|e| unknown_admin(e, &email))?;

    tracing::info!(email = %email, "Admin key rotated");
    print_key(&email, &key);
    Ok(())
}

/// Activate or deactivate an admin.
///
/// Deactivation takes effect at the next login or `auth/me` call; tokens
/// already issued stay valid until they expire.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such admin exists or the
/// database is unreachable.
pub async fn set_active(email: &str, active: bool) -> Result<(), CliError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    AdminUserRepository::new(&pool)
        .set_active(&email, active)
        .await
        .map_err(|e| unknown_admin(e, &email))?;

    if active {
        tracing::info!(email = %email, "Admin activated");
    } else {
        tracing::warn!(email = %email, "Admin deactivated");
    }
    Ok(())
}

/// Log every admin user.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CliError> {
    let pool = connect().await?;
    let admins = AdminUserRepository::new(&pool).list_all().await?;

    tracing::info!("{} admin user(s)", admins.len());
    for admin in admins {
        let last_login = admin
            .last_login_at
            .map_or_else(|| "never".to_owned(), |t| t.to_rfc3339());
        tracing::info!(
            "  {} active={} created={} last_login={}",
            admin.email,
            admin.is_active,
            admin.created_at.to_rfc3339(),
            last_login
        );
    }
    Ok(())
}

fn unknown_admin(err: RepositoryError, email: &Email) -> CliError {
    match err {
        RepositoryError::NotFound => CliError::UnknownAdmin(email.to_string()),
        other => other.into(),
    }
}

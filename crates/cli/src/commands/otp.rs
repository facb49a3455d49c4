//! One-time code housekeeping.

use chrono::{DateTime, Duration, Utc};

use emporium_admin::db::OtpRepository;
use emporium_admin::services::auth::RATE_WINDOW_MINUTES;

use super::{CliError, connect};

/// Delete codes that were used or expired more than `older_than_hours` ago.
///
/// Codes inside the per-user request window are always kept, since they
/// still count towards the request limit.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn purge(older_than_hours: u32) -> Result<(), CliError> {
    let pool = connect().await?;
    let cutoff = purge_cutoff(Utc::now(), older_than_hours);

    let removed = OtpRepository::new(&pool).purge_stale(cutoff).await?;

    tracing::info!(removed, %cutoff, "Purged stale one-time codes");
    Ok(())
}

/// Cutoff for [`purge`], never later than the start of the rate window.
fn purge_cutoff(now: DateTime<Utc>, older_than_hours: u32) -> DateTime<Utc> {
    let requested = now - Duration::hours(i64::from(older_than_hours));
    requested.min(now - Duration::minutes(RATE_WINDOW_MINUTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_honours_requested_age() {
        let now = Utc::now();
        assert_eq!(purge_cutoff(now, 24), now - Duration::hours(24));
    }

    #[test]
    fn test_cutoff_keeps_rate_window() {
        let now = Utc::now();
        let window_start = now - Duration::minutes(RATE_WINDOW_MINUTES);
        assert_eq!(purge_cutoff(now, 0), window_start);
    }
}

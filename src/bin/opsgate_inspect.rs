//! Diagnostic tool: decode a credential and print its claims.
//! Usage: opsgate_inspect <credential>

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let credential = std::env::args()
        .nth(1)
        .context("usage: opsgate_inspect <credential>")?;

    let claims = opsgate::claims::decode(&credential)
        .map_err(|e| anyhow::anyhow!("decode failed: {e}"))?;

    let now = chrono::Utc::now().timestamp();
    let remaining = claims.expires_at_epoch_secs - now;
    info!(
        subject = %claims.subject_id,
        role = claims.role_id,
        status = ?claims.account_status,
        must_change_password = claims.must_change_password,
        expires_at = claims.expires_at_epoch_secs,
        remaining_secs = remaining,
        "claims decoded"
    );
    if remaining <= 0 {
        println!("credential EXPIRED {}s ago", -remaining);
    } else {
        println!("credential valid for another {remaining}s");
    }
    println!(
        "subject={} role={} status={:?} must_change_password={}",
        claims.subject_id, claims.role_id, claims.account_status, claims.must_change_password
    );
    Ok(())
}

use sqlx::SqliteConnection;

use crate::{db_types::EntitlementState, traits::EntitlementApiError};

pub(crate) async fn fetch_entitlement(
    subject: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<EntitlementState>, EntitlementApiError> {
    let state = sqlx::query_as(
        "SELECT is_premium, remaining_free_chats, used_chat_count FROM entitlements WHERE subject = $1",
    )
    .bind(subject)
    .fetch_optional(conn)
    .await?;
    Ok(state)
}

/// Creates a free-tier entitlement row for the subject if it does not have one. Existing rows are left alone.
pub(crate) async fn ensure_entitlement(
    subject: &str,
    allowance: i64,
    conn: &mut SqliteConnection,
) -> Result<(), EntitlementApiError> {
    sqlx::query(
        "INSERT INTO entitlements (subject, remaining_free_chats) VALUES ($1, $2) ON CONFLICT (subject) DO NOTHING",
    )
    .bind(subject)
    .bind(allowance.max(0))
    .execute(conn)
    .await?;
    Ok(())
}

/// Decrements the free-chat counter in one conditional statement, so the last chat can only be taken once.
/// Returns the new counter value, or `None` if nothing was left to take.
pub(crate) async fn consume_free_chat(
    subject: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, EntitlementApiError> {
    let remaining = sqlx::query_scalar(
        r#"
    UPDATE entitlements SET
        remaining_free_chats = remaining_free_chats - 1,
        used_chat_count = used_chat_count + 1,
        updated_at = CURRENT_TIMESTAMP
    WHERE subject = $1 AND is_premium = 0 AND remaining_free_chats > 0
    RETURNING remaining_free_chats
    "#,
    )
    .bind(subject)
    .fetch_optional(conn)
    .await?;
    Ok(remaining)
}

/// Marks the subject as premium. `premium_since` keeps its first value if the subject was already premium.
pub(crate) async fn grant_premium(
    subject: &str,
    allowance: i64,
    conn: &mut SqliteConnection,
) -> Result<(), EntitlementApiError> {
    sqlx::query(
        r#"
    INSERT INTO entitlements (subject, is_premium, remaining_free_chats, premium_since) VALUES ($1, 1, $2, CURRENT_TIMESTAMP)
    ON CONFLICT (subject) DO UPDATE SET
        is_premium = 1,
        premium_since = COALESCE(entitlements.premium_since, CURRENT_TIMESTAMP),
        updated_at = CURRENT_TIMESTAMP
    "#,
    )
    .bind(subject)
    .bind(allowance.max(0))
    .execute(conn)
    .await?;
    Ok(())
}

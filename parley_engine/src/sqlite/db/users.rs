use sqlx::SqliteConnection;

use crate::{
    db_types::{UserAccount, VerifiedIdentity},
    traits::AccountApiError,
};

/// Inserts a new user, or refreshes the presentation fields and login time of an existing one.
/// Returns the number of rows written.
pub(crate) async fn upsert_user(identity: &VerifiedIdentity, conn: &mut SqliteConnection) -> Result<u64, AccountApiError> {
    let result = sqlx::query(
        r#"
    INSERT INTO users (subject, email, display_name, picture_url) VALUES ($1, $2, $3, $4)
    ON CONFLICT (subject) DO UPDATE SET
        email = excluded.email,
        display_name = excluded.display_name,
        picture_url = excluded.picture_url,
        last_login_at = CURRENT_TIMESTAMP
    "#,
    )
    .bind(&identity.external_id)
    .bind(&identity.email)
    .bind(&identity.display_name)
    .bind(&identity.picture_url)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Subjects that have no entitlement row yet are reported with `allowance` free chats.
pub(crate) async fn fetch_user_account(
    subject: &str,
    allowance: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, AccountApiError> {
    let account = sqlx::query_as(
        r#"
    SELECT
        u.subject, u.email, u.display_name, u.picture_url,
        COALESCE(e.is_premium, 0) AS is_premium,
        COALESCE(e.remaining_free_chats, $2) AS remaining_free_chats,
        COALESCE(e.used_chat_count, 0) AS used_chat_count,
        e.premium_since,
        u.created_at, u.last_login_at
    FROM users u LEFT JOIN entitlements e ON u.subject = e.subject
    WHERE u.subject = $1
    "#,
    )
    .bind(subject)
    .bind(allowance)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}

use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentFailure, PaymentRecord, PremiumPayment},
    traits::PaymentApiError,
};

pub(crate) async fn fetch_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, PaymentApiError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Inserts the payment record. The payment id is the primary key, so a duplicate insert is ignored.
/// Returns `true` if the payment was new.
pub(crate) async fn insert_payment(
    subject: &str,
    payment: &PremiumPayment,
    conn: &mut SqliteConnection,
) -> Result<bool, PaymentApiError> {
    let result = sqlx::query(
        r#"
    INSERT INTO payments (payment_id, order_id, subject, amount, currency, paid_at) VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (payment_id) DO NOTHING
    "#,
    )
    .bind(&payment.payment_id)
    .bind(&payment.order_id)
    .bind(subject)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.paid_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn insert_failure(
    subject: &str,
    failure: &NewPaymentFailure,
    conn: &mut SqliteConnection,
) -> Result<i64, PaymentApiError> {
    let id = sqlx::query_scalar(
        r#"
    INSERT INTO payment_failures
        (subject, order_id, payment_id, error_code, error_description, error_source, error_step, error_reason)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id
    "#,
    )
    .bind(subject)
    .bind(&failure.order_id)
    .bind(&failure.payment_id)
    .bind(&failure.error_code)
    .bind(&failure.error_description)
    .bind(&failure.error_source)
    .bind(&failure.error_step)
    .bind(&failure.error_reason)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

#[cfg(test)]
pub(crate) async fn count_failures_for_order(order_id: &str, conn: &mut SqliteConnection) -> Result<i64, PaymentApiError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM payment_failures WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

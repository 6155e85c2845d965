use mockall::mock;
use parley_common::MinorUnits;
use parley_engine::{
    db_types::{EntitlementState, NewPaymentFailure, PaymentRecord, PremiumPayment, UserAccount, VerifiedIdentity},
    traits::{
        AccountApiError,
        AccountManagement,
        EntitlementApiError,
        EntitlementManagement,
        PaymentApiError,
        PaymentManagement,
        UpgradeResult,
    },
};
use razorpay_tools::{OrderGateway, RazorpayApiError, RazorpayOrder};

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn create_or_update_user_session(&self, identity: &VerifiedIdentity) -> Result<bool, AccountApiError>;
        async fn fetch_user_account(&self, subject: &str) -> Result<Option<UserAccount>, AccountApiError>;
    }
}

mock! {
    pub EntitlementManager {}
    impl EntitlementManagement for EntitlementManager {
        async fn fetch_entitlement(&self, subject: &str) -> Result<Option<EntitlementState>, EntitlementApiError>;
        async fn try_consume_free_chat(&self, subject: &str) -> Result<Option<i64>, EntitlementApiError>;
    }
}

mock! {
    pub PaymentManager {}
    impl PaymentManagement for PaymentManager {
        async fn fetch_payment_by_external_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, PaymentApiError>;
        async fn upgrade_to_premium(&self, subject: &str, payment: &PremiumPayment) -> Result<UpgradeResult, PaymentApiError>;
        async fn log_payment_failure(&self, subject: &str, failure: &NewPaymentFailure) -> Result<(), PaymentApiError>;
    }
}

mock! {
    pub Gateway {}
    impl OrderGateway for Gateway {
        async fn create_order(&self, amount: MinorUnits, currency: &str) -> Result<RazorpayOrder, RazorpayApiError>;
    }
}

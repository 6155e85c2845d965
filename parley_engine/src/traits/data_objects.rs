/// The outcome of applying a verified payment to a user's entitlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeResult {
    /// The payment was new and the user is now premium.
    Upgraded,
    /// The payment id had been seen before. Nothing was changed.
    AlreadyProcessed,
}

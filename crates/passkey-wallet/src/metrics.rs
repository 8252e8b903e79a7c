//! Metric names and recording helpers.

/// Gauge: relayer build info, labelled with `version`.
pub const INFO: &str = "passkey_relayer_info";

/// Gauge: relayer is running (set to 1 at startup).
pub const UP: &str = "passkey_relayer_up";

/// Counter: passkeys registered.
pub const REGISTRATIONS_TOTAL: &str = "passkey_relayer_registrations_total";

/// Counter: challenges issued, labelled with `kind`.
pub const CHALLENGES_ISSUED_TOTAL: &str = "passkey_relayer_challenges_issued_total";

/// Counter: ceremonies that failed verification, labelled with `kind`.
pub const VERIFICATION_FAILURES_TOTAL: &str = "passkey_relayer_verification_failures_total";

/// Counter: bundles sent to the EntryPoint, labelled with `chain`.
pub const OPERATIONS_SUBMITTED_TOTAL: &str = "passkey_relayer_operations_submitted_total";

/// Counter: confirmed operations, labelled with `chain` and `outcome`.
pub const OPERATION_OUTCOMES_TOTAL: &str = "passkey_relayer_operation_outcomes_total";

/// Counter: expired entries purged from the options store.
pub const STORE_PURGED_TOTAL: &str = "passkey_relayer_store_purged_total";

/// Label key for version.
pub const LABEL_VERSION: &str = "version";

/// Label key for challenge kind.
pub const LABEL_KIND: &str = "kind";

/// Label key for chain id.
pub const LABEL_CHAIN: &str = "chain";

/// Label key for operation outcome.
pub const LABEL_OUTCOME: &str = "outcome";

/// `kind` label for registration ceremonies.
pub const KIND_REGISTRATION: &str = "registration";

/// `kind` label for sign-in ceremonies.
pub const KIND_AUTHENTICATION: &str = "authentication";

/// `kind` label for operation-hash ceremonies.
pub const KIND_OPERATION: &str = "operation";

/// Records startup metrics (INFO gauge with version label, UP gauge set to 1).
pub fn record_startup_metrics(version: &str) {
    metrics::gauge!(INFO, LABEL_VERSION => version.to_string()).set(1.0);
    metrics::gauge!(UP).set(1.0);
}

/// Counts a registered passkey.
pub fn record_registration() {
    metrics::counter!(REGISTRATIONS_TOTAL).increment(1);
}

/// Counts an issued challenge of `kind`.
pub fn record_challenge_issued(kind: &'static str) {
    metrics::counter!(CHALLENGES_ISSUED_TOTAL, LABEL_KIND => kind).increment(1);
}

/// Counts a ceremony of `kind` that failed verification.
pub fn record_verification_failure(kind: &'static str) {
    metrics::counter!(VERIFICATION_FAILURES_TOTAL, LABEL_KIND => kind).increment(1);
}

/// Counts a bundle sent on `chain`.
pub fn record_operation_submitted(chain: &str) {
    metrics::counter!(OPERATIONS_SUBMITTED_TOTAL, LABEL_CHAIN => chain.to_string()).increment(1);
}

/// Counts a confirmed operation on `chain`.
pub fn record_operation_outcome(chain: &str, success: bool) {
    let outcome = if success { "success" } else { "reverted" };
    metrics::counter!(
        OPERATION_OUTCOMES_TOTAL,
        LABEL_CHAIN => chain.to_string(),
        LABEL_OUTCOME => outcome
    )
    .increment(1);
}

/// Counts `purged` expired store entries.
pub fn record_store_purged(purged: usize) {
    metrics::counter!(STORE_PURGED_TOTAL).increment(purged as u64);
}

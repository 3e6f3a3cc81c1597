//! HandleStripeWebhookHandler - Command handler turning verified Stripe
//! deliveries into canonical subscription state.
//!
//! Signature verification always runs first. Events that change
//! entitlement go through `save_atomic`; informational events are only
//! journaled. Cache sync and activities run strictly after a commit.

use std::sync::Arc;

use crate::domain::billing::{
    compute_period, compute_period_from_invoice, map_provider_status, non_empty_id,
    AtomicSaveResult, Charge, CheckoutSession, CommittedStatus, CorrelationContext, Invoice,
    JournalEntry, LineItem, LogicalState, SnapshotKind, StatusTransition, Subscription,
    SubscriptionStatus,
};
use crate::domain::foundation::{ErrorCode, StatusId, Timestamp, UserId};
use crate::domain::webhook::{
    RoutedEvent, StripeWebhookVerifier, SubscriptionChange, VerifiedEvent, WebhookError,
};
use crate::ports::{ActivityWriter, BillingProvider, EntitlementCache, SubscriptionStateStore};

use super::compensation::{CompensationOutcome, CompensationTrigger, RefundReason};
use super::payment_reference::PaymentReferenceResolver;
use super::post_commit::{ActivityIntent, PostCommitHooks};

/// Line items fetched per checkout when summarizing plan and amount.
const LINE_ITEM_LIMIT: u32 = 10;

/// Invoice metadata key carrying the subscription id.
const INVOICE_SUBSCRIPTION_KEY: &str = "SubscriptionId";

const UNKNOWN_PLAN: &str = "unknown";

/// Command to handle one Stripe webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// What the engine did with a verified event.
///
/// Every variant is acknowledged to the provider; only verification
/// failures are surfaced as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationOutcome {
    /// Status revision and snapshot committed; post-commit hooks ran.
    Committed {
        user_id: UserId,
        is_active: bool,
        logical_state: LogicalState,
    },
    /// Informational event journaled without a status change.
    Journaled { user_id: UserId },
    /// Checkout could not be attributed or persisted; a refund was attempted.
    Compensated {
        reason: RefundReason,
        refund: CompensationOutcome,
    },
    /// Status write did not commit; no side effects ran.
    PersistenceFailed { user_id: UserId, provider_code: u16 },
    /// Snapshot-only write failed.
    JournalFailed { user_id: UserId },
    /// Event id already journaled for this user.
    Duplicate { event_id: String },
    /// Event type without a handler.
    Ignored { event_type: String },
}

/// Handler for Stripe billing webhooks.
pub struct HandleStripeWebhookHandler {
    verifier: StripeWebhookVerifier,
    store: Arc<dyn SubscriptionStateStore>,
    billing: Arc<dyn BillingProvider>,
    payments: PaymentReferenceResolver,
    compensation: CompensationTrigger,
    hooks: PostCommitHooks,
}

impl HandleStripeWebhookHandler {
    pub fn new(
        verifier: StripeWebhookVerifier,
        store: Arc<dyn SubscriptionStateStore>,
        billing: Arc<dyn BillingProvider>,
        cache: Arc<dyn EntitlementCache>,
        activities: Arc<dyn ActivityWriter>,
    ) -> Self {
        Self {
            verifier,
            store,
            payments: PaymentReferenceResolver::new(billing.clone()),
            compensation: CompensationTrigger::new(billing.clone()),
            billing,
            hooks: PostCommitHooks::new(cache, activities),
        }
    }

    /// Overrides the `service` field on emitted activities.
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.hooks = self.hooks.with_service_name(service_name);
        self
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<ReconciliationOutcome, WebhookError> {
        // 1. Authenticate; nothing else runs on failure
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Stripe webhook verified"
        );

        // 2. Route by event kind
        let Some(routed) = event.routed.as_ref() else {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Unhandled event type acknowledged"
            );
            return Ok(ReconciliationOutcome::Ignored {
                event_type: event.event_type.clone(),
            });
        };

        let outcome = match routed {
            RoutedEvent::CompletedCheckout(session) => {
                self.handle_checkout_completed(&event, session).await
            }
            RoutedEvent::NonCompletedCheckout(session) => {
                let user_id = CorrelationContext::from_metadata(&session.metadata).user_or_unknown();
                self.journal(&event, user_id, SnapshotKind::checkout_event(&event.event_type), &session.id)
                    .await
            }
            RoutedEvent::SubscriptionChanged {
                change,
                subscription,
            } => {
                self.handle_subscription_changed(&event, *change, subscription)
                    .await
            }
            RoutedEvent::SubscriptionDeleted(subscription) => {
                self.handle_subscription_deleted(&event, subscription).await
            }
            RoutedEvent::SubscriptionMeta(subscription) => {
                let user_id =
                    CorrelationContext::from_metadata(&subscription.metadata).user_or_unknown();
                self.journal(
                    &event,
                    user_id,
                    SnapshotKind::subscription_event(&event.event_type),
                    &subscription.id,
                )
                .await
            }
            RoutedEvent::Invoice {
                payment_succeeded,
                invoice,
            } => self.handle_invoice(&event, *payment_succeeded, invoice).await,
            RoutedEvent::PaymentIntent(intent) => {
                let user_id = CorrelationContext::from_metadata(&intent.metadata).user_or_unknown();
                self.journal(
                    &event,
                    user_id,
                    SnapshotKind::payment_intent(&event.event_type),
                    &intent.id,
                )
                .await
            }
            RoutedEvent::ChargeRefunded(charge) => self.handle_charge_refunded(&event, charge).await,
            RoutedEvent::RefundMeta { phase, refund } => {
                let user_id = CorrelationContext::from_metadata(&refund.metadata).user_or_unknown();
                self.journal(&event, user_id, SnapshotKind::refund(phase.as_str()), &refund.id)
                    .await
            }
        };

        Ok(outcome)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Entitlement-changing routes
    // ════════════════════════════════════════════════════════════════════════════

    async fn handle_checkout_completed(
        &self,
        event: &VerifiedEvent,
        session: &CheckoutSession,
    ) -> ReconciliationOutcome {
        let subscription_id = non_empty_id(session.subscription.as_ref());

        // Resolved up front so every refund path has it
        let mut payment_id = non_empty_id(session.payment_intent.as_ref());
        if payment_id.is_none() {
            if let Some(id) = subscription_id.as_deref() {
                payment_id = self.payments.from_subscription(id).await;
            }
        }

        let user_id = match CorrelationContext::from_metadata(&session.metadata) {
            CorrelationContext::Resolved(user_id) => user_id,
            CorrelationContext::Missing => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    "Checkout completed without user correlation"
                );
                return self
                    .compensate(payment_id.as_deref(), RefundReason::MissingUserId, "unknown")
                    .await;
            }
            CorrelationContext::Invalid { raw } => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    raw_user_id = %raw,
                    "Checkout completed with unparseable user correlation"
                );
                return self
                    .compensate(payment_id.as_deref(), RefundReason::InvalidUserId, &raw)
                    .await;
            }
        };

        if self.already_processed(user_id, event).await {
            return ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            };
        }

        let subscription = match subscription_id.as_deref() {
            Some(id) => self.fetch_subscription(id).await.or_else(|| {
                session
                    .subscription
                    .as_ref()
                    .and_then(|s| s.as_object())
                    .cloned()
            }),
            None => None,
        };

        let (plan, amount) = self.checkout_summary(&session.id).await;
        let mapped = map_provider_status(subscription.as_ref(), true);
        let period = compute_period(subscription.as_ref(), Timestamp::now());

        let transition = StatusTransition {
            subscription_id,
            payment_id: payment_id.clone(),
            is_active: mapped.is_active,
            logical_state: mapped.logical_state,
            period: Some(period),
        };
        let entry = journal_entry(event, SnapshotKind::checkout_completed(), &session.id);

        match self.commit(user_id, transition, entry).await {
            Ok(committed) => {
                let intent = if committed.status().is_active {
                    ActivityIntent::Subscribed { plan, amount }
                } else {
                    ActivityIntent::None
                };
                self.finish(committed, intent).await
            }
            Err(failed) => {
                if self.is_conflicting_replay(user_id, event, &failed).await {
                    return ReconciliationOutcome::Duplicate {
                        event_id: event.id.clone(),
                    };
                }
                log_failed_save(user_id, event, &failed);
                self.compensate(
                    payment_id.as_deref(),
                    RefundReason::SubscriptionStateError,
                    &user_id.to_string(),
                )
                .await
            }
        }
    }

    async fn handle_subscription_changed(
        &self,
        event: &VerifiedEvent,
        change: SubscriptionChange,
        subscription: &Subscription,
    ) -> ReconciliationOutcome {
        let kind = SnapshotKind::subscription_change(change.as_str(), &subscription.status);

        let Some(user_id) = CorrelationContext::from_metadata(&subscription.metadata).user_id() else {
            tracing::warn!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                "Subscription change without user correlation; journaling only"
            );
            return self
                .journal(event, UserId::unknown(), kind, &subscription.id)
                .await;
        };

        if self.already_processed(user_id, event).await {
            return ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            };
        }

        let payment_id = match non_empty_id(subscription.latest_invoice.as_ref()) {
            Some(invoice_id) => self.payments.from_invoice(&invoice_id).await,
            None => None,
        };
        let mapped = map_provider_status(Some(subscription), true);

        let transition = StatusTransition {
            subscription_id: Some(subscription.id.clone()),
            payment_id,
            is_active: mapped.is_active,
            logical_state: mapped.logical_state,
            period: Some(compute_period(Some(subscription), Timestamp::now())),
        };

        let intent = if change == SubscriptionChange::Updated && subscription.status == "canceled" {
            ActivityIntent::Canceled
        } else {
            ActivityIntent::None
        };

        self.commit_or_report(user_id, event, transition, journal_entry(event, kind, &subscription.id), intent)
            .await
    }

    async fn handle_subscription_deleted(
        &self,
        event: &VerifiedEvent,
        subscription: &Subscription,
    ) -> ReconciliationOutcome {
        let kind = SnapshotKind::subscription_deleted();

        let Some(user_id) = CorrelationContext::from_metadata(&subscription.metadata).user_id() else {
            tracing::warn!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                "Subscription deletion without user correlation; journaling only"
            );
            return self
                .journal(event, UserId::unknown(), kind, &subscription.id)
                .await;
        };

        if self.already_processed(user_id, event).await {
            return ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            };
        }

        let mapped = map_provider_status(Some(subscription), false);
        let transition = StatusTransition {
            subscription_id: Some(subscription.id.clone()),
            payment_id: None,
            is_active: mapped.is_active,
            logical_state: mapped.logical_state,
            period: None,
        };

        self.commit_or_report(
            user_id,
            event,
            transition,
            journal_entry(event, kind, &subscription.id),
            ActivityIntent::Canceled,
        )
        .await
    }

    async fn handle_invoice(
        &self,
        event: &VerifiedEvent,
        payment_succeeded: bool,
        invoice: &Invoice,
    ) -> ReconciliationOutcome {
        let kind = SnapshotKind::invoice(&event.event_type);
        let correlation = CorrelationContext::from_metadata(&invoice.metadata);

        let user_id = match correlation.user_id() {
            Some(user_id) if payment_succeeded => user_id,
            _ => {
                return self
                    .journal(event, correlation.user_or_unknown(), kind, &invoice.id)
                    .await
            }
        };

        if self.already_processed(user_id, event).await {
            return ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            };
        }

        let subscription_id = invoice
            .metadata
            .get(INVOICE_SUBSCRIPTION_KEY)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| non_empty_id(invoice.subscription.as_ref()));

        // Prefer the payment list in the payload; fetch when it was not expanded
        let payment_id = match PaymentReferenceResolver::select_payment(invoice) {
            Some(id) => Some(id),
            None => self.payments.from_invoice(&invoice.id).await,
        };

        let transition = StatusTransition {
            subscription_id,
            payment_id,
            is_active: true,
            logical_state: LogicalState::PaymentSucceeded,
            period: compute_period_from_invoice(invoice),
        };

        self.commit_or_report(
            user_id,
            event,
            transition,
            journal_entry(event, kind, &invoice.id),
            ActivityIntent::None,
        )
        .await
    }

    async fn handle_charge_refunded(
        &self,
        event: &VerifiedEvent,
        charge: &Charge,
    ) -> ReconciliationOutcome {
        let kind = SnapshotKind::charge_refunded();

        let Some(user_id) = CorrelationContext::from_metadata(&charge.metadata).user_id() else {
            tracing::warn!(
                event_id = %event.id,
                charge_id = %charge.id,
                "Refunded charge without user correlation; journaling only"
            );
            return self.journal(event, UserId::unknown(), kind, &charge.id).await;
        };

        if self.already_processed(user_id, event).await {
            return ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            };
        }

        let transition = StatusTransition {
            subscription_id: None,
            payment_id: non_empty_id(charge.payment_intent.as_ref()),
            is_active: false,
            logical_state: LogicalState::ChargeRefunded,
            period: None,
        };

        self.commit_or_report(
            user_id,
            event,
            transition,
            journal_entry(event, kind, &charge.id),
            ActivityIntent::Canceled,
        )
        .await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Persistence helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn commit(
        &self,
        user_id: UserId,
        transition: StatusTransition,
        entry: JournalEntry,
    ) -> Result<CommittedStatus, AtomicSaveResult> {
        let previous = self.latest_status(user_id).await;
        let status = SubscriptionStatus::record(user_id, transition, Timestamp::now());
        self.store
            .save_atomic(&status, entry)
            .await
            .into_commit(status, previous)
    }

    async fn commit_or_report(
        &self,
        user_id: UserId,
        event: &VerifiedEvent,
        transition: StatusTransition,
        entry: JournalEntry,
        intent: ActivityIntent,
    ) -> ReconciliationOutcome {
        match self.commit(user_id, transition, entry).await {
            Ok(committed) => self.finish(committed, intent).await,
            Err(failed) => {
                if self.is_conflicting_replay(user_id, event, &failed).await {
                    return ReconciliationOutcome::Duplicate {
                        event_id: event.id.clone(),
                    };
                }
                log_failed_save(user_id, event, &failed);
                ReconciliationOutcome::PersistenceFailed {
                    user_id,
                    provider_code: failed.provider_code,
                }
            }
        }
    }

    async fn finish(
        &self,
        committed: CommittedStatus,
        intent: ActivityIntent,
    ) -> ReconciliationOutcome {
        let status = committed.status();
        tracing::info!(
            user_id = %status.user_id,
            status_id = %status.id.as_uuid(),
            is_active = status.is_active,
            logical_state = %status.logical_state.as_str(),
            "Subscription status committed"
        );

        self.hooks.after_commit(&committed, intent).await;

        ReconciliationOutcome::Committed {
            user_id: status.user_id,
            is_active: status.is_active,
            logical_state: status.logical_state.clone(),
        }
    }

    async fn journal(
        &self,
        event: &VerifiedEvent,
        user_id: UserId,
        kind: SnapshotKind,
        external_id: &str,
    ) -> ReconciliationOutcome {
        if self.already_processed(user_id, event).await {
            return ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            };
        }

        let status_id = self
            .latest_status(user_id)
            .await
            .map(|status| status.id)
            .unwrap_or_else(StatusId::nil);

        match self
            .store
            .save_snapshot(user_id, status_id, journal_entry(event, kind, external_id))
            .await
        {
            Ok(_) => {
                tracing::debug!(
                    event_id = %event.id,
                    user_id = %user_id,
                    external_id,
                    "Event journaled"
                );
                ReconciliationOutcome::Journaled { user_id }
            }
            Err(e) if e.code == ErrorCode::Conflict => ReconciliationOutcome::Duplicate {
                event_id: event.id.clone(),
            },
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    user_id = %user_id,
                    error = %e,
                    "Snapshot write failed"
                );
                ReconciliationOutcome::JournalFailed { user_id }
            }
        }
    }

    /// Read failures count as "not seen": a replay then hits the store's
    /// event-id uniqueness instead.
    async fn already_processed(&self, user_id: UserId, event: &VerifiedEvent) -> bool {
        match self.store.has_processed_event(user_id, &event.id).await {
            Ok(true) => {
                tracing::info!(
                    event_id = %event.id,
                    user_id = %user_id,
                    "Event already processed; skipping"
                );
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    user_id = %user_id,
                    error = %e,
                    "Dedupe lookup failed; processing event"
                );
                false
            }
        }
    }

    /// A 409 caused by a concurrent delivery of the same event.
    async fn is_conflicting_replay(
        &self,
        user_id: UserId,
        event: &VerifiedEvent,
        failed: &AtomicSaveResult,
    ) -> bool {
        failed.provider_code == 409 && self.already_processed(user_id, event).await
    }

    async fn latest_status(&self, user_id: UserId) -> Option<SubscriptionStatus> {
        match self.store.get_latest_details(user_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Latest status lookup failed");
                None
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Provider helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn fetch_subscription(&self, subscription_id: &str) -> Option<Subscription> {
        match self.billing.get_subscription(subscription_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(subscription_id, error = %e, "Subscription fetch failed");
                None
            }
        }
    }

    async fn checkout_summary(&self, session_id: &str) -> (String, f64) {
        let items = match self
            .billing
            .list_checkout_line_items(session_id, LINE_ITEM_LIMIT)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Line item listing failed");
                Vec::new()
            }
        };
        (plan_name(&items), amount_in_major_units(&items))
    }

    async fn compensate(
        &self,
        payment_id: Option<&str>,
        reason: RefundReason,
        user_ref: &str,
    ) -> ReconciliationOutcome {
        let refund = self.compensation.compensate(payment_id, reason, user_ref).await;
        ReconciliationOutcome::Compensated { reason, refund }
    }
}

fn journal_entry(event: &VerifiedEvent, kind: SnapshotKind, external_id: &str) -> JournalEntry {
    JournalEntry {
        kind,
        external_id: external_id.to_string(),
        event_id: event.id.clone(),
        raw_json: event.raw_json.clone(),
    }
}

fn log_failed_save(user_id: UserId, event: &VerifiedEvent, failed: &AtomicSaveResult) {
    tracing::error!(
        event_id = %event.id,
        user_id = %user_id,
        provider_code = failed.provider_code,
        status_saved = failed.status_saved,
        snapshot_saved = failed.snapshot_saved,
        detail = failed.error_detail.as_deref().unwrap_or(""),
        "Atomic status save did not commit"
    );
}

/// First item's price nickname, then its description, then "unknown".
fn plan_name(items: &[LineItem]) -> String {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    items
        .first()
        .and_then(|item| {
            item.price
                .as_ref()
                .and_then(|price| non_empty(&price.nickname))
                .or_else(|| non_empty(&item.description))
        })
        .unwrap_or_else(|| UNKNOWN_PLAN.to_string())
}

fn amount_in_major_units(items: &[LineItem]) -> f64 {
    items.iter().map(|item| item.amount_total).sum::<i64>() as f64 / 100.0
}

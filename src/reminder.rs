//! Periodic reminder sweep for stalled bookings
//!
//! Each sweep walks every session, decides which nudges are due with the pure
//! [`due_reminders`], bumps the counters inside a quiet store update and then
//! delivers the nudges through the runtime.

use crate::runtime::{BookingRuntime, NotificationSink, Transport};
use crate::session::{Activity, Session, SessionStore, StoreError};
use crate::state_machine::{prompts, BookingState, OutboundIntent};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// Booking left unfinished
    Inactive,
    /// Online payment chosen but no receipt yet
    PaymentScreenshot,
}

impl ReminderKind {
    pub fn intent(self) -> OutboundIntent {
        match self {
            ReminderKind::Inactive => OutboundIntent::text(prompts::REMIND_BOOKING),
            ReminderKind::PaymentScreenshot => OutboundIntent::text(prompts::REMIND_PAYMENT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub inactive_after: Duration,
    pub payment_after: Duration,
    pub max_inactive: u32,
    pub max_payment: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            inactive_after: Duration::from_secs(60 * 60),
            payment_after: Duration::from_secs(30 * 60),
            max_inactive: 2,
            max_payment: 2,
        }
    }
}

impl ReminderPolicy {
    fn max_for(&self, kind: ReminderKind) -> u32 {
        match kind {
            ReminderKind::Inactive => self.max_inactive,
            ReminderKind::PaymentScreenshot => self.max_payment,
        }
    }
}

/// Strictly more than `threshold` has passed since `since`
fn elapsed_beyond(since: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now.signed_duration_since(since)
        .to_std()
        .is_ok_and(|elapsed| elapsed > threshold)
}

/// Reminders owed to `session` at `now`
pub fn due_reminders(session: &Session, now: DateTime<Utc>, policy: &ReminderPolicy) -> Vec<ReminderKind> {
    if session.state.reminders_suspended() {
        return Vec::new();
    }

    let kind = if session.state == BookingState::WaitingScreenshot {
        let overdue = session
            .timestamps
            .payment_initiated_at
            .is_some_and(|at| elapsed_beyond(at, now, policy.payment_after));
        overdue.then_some(ReminderKind::PaymentScreenshot)
    } else {
        elapsed_beyond(session.timestamps.last_activity_at, now, policy.inactive_after)
            .then_some(ReminderKind::Inactive)
    };

    kind.into_iter()
        .filter(|k| session.reminders.count(*k) < policy.max_for(*k))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Another sweep was still running
    pub skipped: bool,
    pub examined: usize,
    pub nudges_sent: usize,
    pub delivery_failures: usize,
}

/// Clears the running flag when the sweep ends, however it ends
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReminderScheduler<S, T, N>
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
    N: NotificationSink + ?Sized,
{
    runtime: Arc<BookingRuntime<S, T, N>>,
    policy: ReminderPolicy,
    running: AtomicBool,
}

impl<S, T, N> ReminderScheduler<S, T, N>
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
    N: NotificationSink + ?Sized,
{
    pub fn new(runtime: Arc<BookingRuntime<S, T, N>>, policy: ReminderPolicy) -> Self {
        Self {
            runtime,
            policy,
            running: AtomicBool::new(false),
        }
    }

    /// One pass over all sessions. A sweep that overlaps a running one is skipped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let Some(_guard) = SweepGuard::acquire(&self.running) else {
            tracing::debug!("Reminder sweep already running, skipping");
            return SweepReport {
                skipped: true,
                ..SweepReport::default()
            };
        };

        let mut report = SweepReport::default();
        let store = self.runtime.store();
        let sessions = match store.list_all().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!(error = %e, "Reminder sweep could not list sessions");
                return report;
            }
        };

        for session in sessions {
            report.examined += 1;
            let identity = session.identity.as_str();
            let policy = &self.policy;

            let mut due = Vec::new();
            let counted = store
                .update(identity, &mut |s: &mut Session| {
                    due = due_reminders(s, now, policy);
                    for kind in &due {
                        s.reminders.increment(*kind);
                    }
                    Activity::Quiet
                })
                .await;

            match counted {
                Ok(_) => {}
                // Reset between listing and updating
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => {
                    tracing::warn!(identity = %identity, error = %e, "Failed to record reminder");
                    continue;
                }
            }
            if due.is_empty() {
                continue;
            }

            tracing::info!(identity = %identity, reminders = ?due, "Sending reminders");
            let intents: Vec<OutboundIntent> = due.iter().map(|k| k.intent()).collect();
            let (delivered, failed) = self.runtime.deliver(identity, &intents).await;
            report.nudges_sent += delivered;
            report.delivery_failures += failed;
        }

        report
    }
}

impl<S, T, N> ReminderScheduler<S, T, N>
where
    S: SessionStore + ?Sized + 'static,
    T: Transport + ?Sized + 'static,
    N: NotificationSink + ?Sized + 'static,
{
    /// Sweep every `every` until `cancel` fires
    pub fn spawn(self: Arc<Self>, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = every.as_secs(), "Reminder scheduler started");
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = self.sweep(Utc::now()).await;
                        tracing::debug!(
                            examined = report.examined,
                            nudges = report.nudges_sent,
                            failures = report.delivery_failures,
                            "Reminder sweep finished"
                        );
                    }
                }
            }

            tracing::info!("Reminder scheduler stopped");
        })
    }
}

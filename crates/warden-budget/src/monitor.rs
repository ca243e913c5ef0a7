//! Token budget monitor.
//!
//! Charges are serialized per session through a session-scoped mutex held
//! in a [`DashMap`]. Each cell is hydrated from the ledger the first time a
//! session is touched in this process, so separate hook processes observe
//! each other's usage.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use warden_core::SessionId;
use warden_settings::BudgetSettings;

use crate::errors::{BudgetError, Result};
use crate::ledger::{LedgerStore, UsageLedger};
use crate::types::{BudgetLevel, BudgetStatus, TokenUsage};

/// Tracks consumption against a per-session inclusive limit.
pub struct TokenBudgetMonitor {
    settings: BudgetSettings,
    store: Option<LedgerStore>,
    sessions: DashMap<SessionId, Arc<Mutex<TokenUsage>>>,
    total: Mutex<u64>,
}

impl std::fmt::Debug for TokenBudgetMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBudgetMonitor")
            .field("enabled", &self.settings.enabled)
            .field("session_limit", &self.settings.session_limit)
            .field("sessions", &self.sessions.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl TokenBudgetMonitor {
    /// In-memory monitor (nothing persisted).
    #[must_use]
    pub fn new(settings: BudgetSettings) -> Self {
        Self {
            settings,
            store: None,
            sessions: DashMap::new(),
            total: Mutex::new(0),
        }
    }

    /// Monitor backed by a ledger file.
    pub fn with_ledger(settings: BudgetSettings, store: LedgerStore) -> Result<Self> {
        let ledger = store.load()?;
        let monitor = Self {
            settings,
            store: Some(store),
            sessions: DashMap::new(),
            total: Mutex::new(ledger.total_accumulated),
        };
        Ok(monitor)
    }

    /// Active settings.
    pub fn settings(&self) -> &BudgetSettings {
        &self.settings
    }

    /// Add `amount` to the session's usage.
    ///
    /// Returns [`BudgetError::Exceeded`] whenever usage is strictly above the
    /// limit after the charge, including on every later charge until reset.
    pub fn charge(&self, session_id: &SessionId, amount: u64) -> Result<BudgetStatus> {
        let cell = self.cell(session_id)?;
        let mut usage = cell.lock();
        if amount > 0 {
            usage.consumed = usage.consumed.saturating_add(amount);
            usage.updated_at = Utc::now();
            {
                let mut total = self.total.lock();
                *total = total.saturating_add(amount);
            }
            self.persist(&usage, amount)?;
            debug!(
                session_id = %session_id,
                amount,
                consumed = usage.consumed,
                limit = usage.limit,
                "tokens charged"
            );
        }
        self.verdict(&usage)
    }

    /// Check the session without charging.
    pub fn check(&self, session_id: &SessionId) -> Result<BudgetStatus> {
        self.charge(session_id, 0)
    }

    /// Charge the growth of a host-reported cumulative total.
    ///
    /// A total lower than the previous observation (the host compacted its
    /// context) charges nothing and becomes the new baseline.
    pub fn observe(&self, session_id: &SessionId, cumulative: u64) -> Result<BudgetStatus> {
        let cell = self.cell(session_id)?;
        let mut usage = cell.lock();
        let delta = cumulative.saturating_sub(usage.last_observed);
        if cumulative < usage.last_observed {
            debug!(
                session_id = %session_id,
                previous = usage.last_observed,
                cumulative,
                "cumulative usage dropped, rebasing"
            );
        }
        usage.last_observed = cumulative;
        usage.consumed = usage.consumed.saturating_add(delta);
        usage.updated_at = Utc::now();
        {
            let mut total = self.total.lock();
            *total = total.saturating_add(delta);
        }
        self.persist(&usage, delta)?;
        self.verdict(&usage)
    }

    /// Tokens left for the session.
    pub fn remaining(&self, session_id: &SessionId) -> Result<u64> {
        let cell = self.cell(session_id)?;
        let usage = cell.lock();
        Ok(usage.remaining())
    }

    /// Status report for the session.
    pub fn status(&self, session_id: &SessionId) -> Result<BudgetStatus> {
        let cell = self.cell(session_id)?;
        let usage = cell.lock();
        Ok(self.report(&usage))
    }

    /// Start accounting for a new session and mark it current.
    pub fn begin_session(&self, session_id: &SessionId) -> Result<BudgetStatus> {
        let status = self.reset_inner(session_id, true)?;
        info!(session_id = %session_id, limit = status.limit, "budget session started");
        Ok(status)
    }

    /// Operator reset: zero the session's usage.
    pub fn reset(&self, session_id: &SessionId) -> Result<BudgetStatus> {
        let status = self.reset_inner(session_id, false)?;
        info!(session_id = %session_id, "budget reset by operator");
        Ok(status)
    }

    /// Session most recently started, from the ledger.
    pub fn current_session(&self) -> Result<Option<SessionId>> {
        Ok(self.ledger()?.current_session)
    }

    /// Full ledger snapshot (in-memory sessions when not persistent).
    pub fn ledger(&self) -> Result<UsageLedger> {
        if let Some(store) = &self.store {
            return Ok(store.load()?);
        }
        let mut ledger = UsageLedger {
            total_accumulated: *self.total.lock(),
            ..UsageLedger::default()
        };
        for entry in &self.sessions {
            let usage = entry.value().lock().clone();
            let _ = ledger.sessions.insert(entry.key().to_string(), usage);
        }
        Ok(ledger)
    }

    fn reset_inner(&self, session_id: &SessionId, mark_current: bool) -> Result<BudgetStatus> {
        let fresh = TokenUsage::new(session_id.clone(), self.settings.session_limit, self.resets_at());
        let cell = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(fresh.clone())))
            .clone();
        let mut usage = cell.lock();
        *usage = fresh;
        if let Some(store) = &self.store {
            let snapshot = usage.clone();
            let current = mark_current.then(|| session_id.clone());
            store.update(move |ledger| {
                if let Some(current) = current {
                    ledger.current_session = Some(current);
                }
                let _ = ledger
                    .sessions
                    .insert(snapshot.session_id.to_string(), snapshot);
            })?;
        }
        Ok(self.report(&usage))
    }

    fn cell(&self, session_id: &SessionId) -> Result<Arc<Mutex<TokenUsage>>> {
        if let Some(cell) = self.sessions.get(session_id) {
            return Ok(Arc::clone(cell.value()));
        }
        let loaded = match &self.store {
            Some(store) => store.load()?.sessions.remove(session_id.as_str()),
            None => None,
        };
        let usage = loaded.unwrap_or_else(|| {
            TokenUsage::new(session_id.clone(), self.settings.session_limit, self.resets_at())
        });
        let cell = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(usage)))
            .clone();
        Ok(cell)
    }

    fn persist(&self, usage: &TokenUsage, delta: u64) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let snapshot = usage.clone();
        let result = store.update(move |ledger| {
            ledger.total_accumulated = ledger.total_accumulated.saturating_add(delta);
            let _ = ledger
                .sessions
                .insert(snapshot.session_id.to_string(), snapshot);
        });
        if let Err(error) = &result {
            warn!(path = %store.path().display(), error = %error, "failed to persist token usage");
        }
        Ok(result?)
    }

    fn verdict(&self, usage: &TokenUsage) -> Result<BudgetStatus> {
        if self.settings.enabled && usage.is_exceeded() {
            warn!(
                session_id = %usage.session_id,
                consumed = usage.consumed,
                limit = usage.limit,
                "token budget exceeded"
            );
            return Err(BudgetError::Exceeded {
                session_id: usage.session_id.to_string(),
                consumed: usage.consumed,
                limit: usage.limit,
            });
        }
        Ok(self.report(usage))
    }

    #[allow(clippy::cast_precision_loss)]
    fn report(&self, usage: &TokenUsage) -> BudgetStatus {
        let ratio = if usage.limit == 0 {
            1.0
        } else {
            usage.consumed as f64 / usage.limit as f64
        };
        let level = if usage.is_exceeded() {
            BudgetLevel::Exceeded
        } else if ratio >= self.settings.critical_ratio {
            BudgetLevel::Critical
        } else if ratio >= self.settings.warning_ratio {
            BudgetLevel::Warning
        } else {
            BudgetLevel::Ok
        };
        BudgetStatus {
            session_id: usage.session_id.clone(),
            consumed: usage.consumed,
            limit: usage.limit,
            remaining: usage.remaining(),
            ratio,
            level,
            total_accumulated: *self.total.lock(),
            total_limit: self.settings.total_limit,
        }
    }

    fn resets_at(&self) -> Option<chrono::DateTime<Utc>> {
        let hours = i64::try_from(self.settings.reset_window_hours?).ok()?;
        Some(Utc::now() + Duration::hours(hours))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn settings(limit: u64) -> BudgetSettings {
        BudgetSettings {
            session_limit: limit,
            ..BudgetSettings::default()
        }
    }

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[test]
    fn second_charge_exceeds() {
        let monitor = TokenBudgetMonitor::new(settings(1000));
        let s = sid("s1");
        let first = monitor.charge(&s, 600).unwrap();
        assert_eq!(first.remaining, 400);
        let err = monitor.charge(&s, 600).unwrap_err();
        assert_matches!(err, BudgetError::Exceeded { consumed: 1200, limit: 1000, .. });
        assert_eq!(monitor.remaining(&s).unwrap(), 0);
    }

    #[test]
    fn exactly_at_limit_is_within_budget() {
        let monitor = TokenBudgetMonitor::new(settings(1000));
        let status = monitor.charge(&sid("s"), 1000).unwrap();
        assert_eq!(status.remaining, 0);
        assert_eq!(status.level, BudgetLevel::Critical);
    }

    #[test]
    fn stays_exceeded_until_reset() {
        let monitor = TokenBudgetMonitor::new(settings(10));
        let s = sid("s");
        assert!(monitor.charge(&s, 11).is_err());
        assert!(monitor.charge(&s, 0).is_err());
        assert!(monitor.check(&s).unwrap_err().is_exceeded());
        let status = monitor.reset(&s).unwrap();
        assert_eq!(status.consumed, 0);
        assert!(monitor.charge(&s, 5).is_ok());
    }

    #[test]
    fn saturating_charge() {
        let monitor = TokenBudgetMonitor::new(settings(10));
        let s = sid("s");
        let _ = monitor.charge(&s, u64::MAX);
        let err = monitor.charge(&s, u64::MAX).unwrap_err();
        assert_matches!(err, BudgetError::Exceeded { consumed: u64::MAX, .. });
    }

    #[test]
    fn sessions_are_independent() {
        let monitor = TokenBudgetMonitor::new(settings(100));
        assert!(monitor.charge(&sid("a"), 150).is_err());
        assert_eq!(monitor.charge(&sid("b"), 50).unwrap().remaining, 50);
    }

    #[test]
    fn observe_charges_deltas() {
        let monitor = TokenBudgetMonitor::new(settings(1000));
        let s = sid("s");
        assert_eq!(monitor.observe(&s, 100).unwrap().consumed, 100);
        assert_eq!(monitor.observe(&s, 250).unwrap().consumed, 250);
        // host compacted: rebase without charging
        assert_eq!(monitor.observe(&s, 40).unwrap().consumed, 250);
        assert_eq!(monitor.observe(&s, 90).unwrap().consumed, 300);
    }

    #[test]
    fn levels_follow_ratios() {
        let monitor = TokenBudgetMonitor::new(settings(100));
        let s = sid("s");
        assert_eq!(monitor.charge(&s, 10).unwrap().level, BudgetLevel::Ok);
        assert_eq!(monitor.charge(&s, 65).unwrap().level, BudgetLevel::Warning);
        assert_eq!(monitor.charge(&s, 15).unwrap().level, BudgetLevel::Critical);
        assert!(monitor.charge(&s, 11).is_err());
        assert_eq!(monitor.status(&s).unwrap().level, BudgetLevel::Exceeded);
    }

    #[test]
    fn disabled_never_blocks() {
        let monitor = TokenBudgetMonitor::new(BudgetSettings {
            enabled: false,
            session_limit: 10,
            ..BudgetSettings::default()
        });
        let status = monitor.charge(&sid("s"), 50).unwrap();
        assert_eq!(status.level, BudgetLevel::Exceeded);
    }

    #[test]
    fn usage_survives_across_monitors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let s = sid("s1");
        {
            let monitor =
                TokenBudgetMonitor::with_ledger(settings(1000), LedgerStore::new(&path)).unwrap();
            let _ = monitor.begin_session(&s).unwrap();
            let _ = monitor.charge(&s, 600).unwrap();
        }
        let monitor =
            TokenBudgetMonitor::with_ledger(settings(1000), LedgerStore::new(&path)).unwrap();
        assert_eq!(monitor.remaining(&s).unwrap(), 400);
        assert!(monitor.charge(&s, 600).is_err());
        assert_eq!(monitor.current_session().unwrap(), Some(s));
        assert_eq!(monitor.ledger().unwrap().total_accumulated, 1200);
    }

    #[test]
    fn begin_session_resets_existing_usage() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("usage.json"));
        let monitor = TokenBudgetMonitor::with_ledger(settings(100), store).unwrap();
        let s = sid("s");
        let _ = monitor.charge(&s, 90).unwrap();
        let status = monitor.begin_session(&s).unwrap();
        assert_eq!(status.consumed, 0);
        assert_eq!(status.remaining, 100);
    }

    #[test]
    fn concurrent_charges_are_serialized() {
        let monitor = Arc::new(TokenBudgetMonitor::new(settings(1_000_000)));
        let s = sid("s");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                let s = s.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = monitor.charge(&s, 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(monitor.status(&s).unwrap().consumed, 800);
    }
}

//! Concurrent session registry.
//!
//! Sessions live behind one lock each, so requests against different games
//! never contend. Expiry is mark-and-sweep: a sweep marks sessions idle past
//! the TTL, and a later sweep removes them only if they are still idle past
//! TTL plus the grace window. A session whose lock is held is in use and is
//! skipped.

use crate::errors::{NotFoundError, QuizResult};
use crate::session::GameSession;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type SharedSession = Arc<Mutex<GameSession>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    pub interval: Duration,
    pub ttl: Duration,
    pub grace: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub marked: usize,
    pub swept: usize,
    pub busy: usize,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
    marked: Mutex<HashSet<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn idle_for(session: &GameSession, now: DateTime<Utc>) -> Duration {
    (now - session.last_activity())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: GameSession) -> SharedSession {
        let id = session.session_id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, session_id: &str) -> Result<SharedSession, NotFoundError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| NotFoundError::Session(session_id.to_string()))
    }

    /// Run `f` with exclusive access to one session.
    pub fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut GameSession) -> QuizResult<T>,
    ) -> QuizResult<T> {
        let shared = self.get(session_id)?;
        self.run_locked(session_id, &shared, f)
    }

    /// Lock `shared` and run `f`, provided the map still holds that exact
    /// entry. A sweep or re-insert may land between lookup and lock.
    fn run_locked<T>(
        &self,
        session_id: &str,
        shared: &SharedSession,
        f: impl FnOnce(&mut GameSession) -> QuizResult<T>,
    ) -> QuizResult<T> {
        let mut session = lock(shared);
        if !self.holds(session_id, shared) {
            tracing::debug!(session_id, "session left the registry while waiting for its lock");
            return Err(NotFoundError::Session(session_id.to_string()).into());
        }
        f(&mut session)
    }

    fn holds(&self, session_id: &str, shared: &SharedSession) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, shared))
    }

    pub fn remove(&self, session_id: &str) -> Option<SharedSession> {
        lock(&self.marked).remove(session_id);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.get(session_id).is_ok()
    }

    /// One mark-and-sweep pass as of `now`.
    pub fn sweep_expired(&self, ttl: Duration, grace: Duration, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let entries: Vec<(String, SharedSession)> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, session)| (id.clone(), Arc::clone(session)))
            .collect();

        let mut doomed = Vec::new();
        {
            let mut marked = lock(&self.marked);
            for (id, shared) in entries {
                let session = match shared.try_lock() {
                    Ok(session) => session,
                    Err(TryLockError::WouldBlock) => {
                        report.busy += 1;
                        continue;
                    }
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                };

                let idle = idle_for(&session, now);
                if idle <= ttl {
                    marked.remove(&id);
                } else if marked.contains(&id) && idle > ttl + grace {
                    doomed.push(id);
                } else if marked.insert(id) {
                    report.marked += 1;
                }
            }
        }

        if doomed.is_empty() {
            return report;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let mut marked = lock(&self.marked);
        for id in doomed {
            // Re-check under the map lock: a request may have touched it since.
            let still_idle = match sessions.get(&id).map(|s| s.try_lock()) {
                Some(Ok(session)) => idle_for(&session, now) > ttl + grace,
                _ => false,
            };
            if still_idle {
                sessions.remove(&id);
                marked.remove(&id);
                report.swept += 1;
                tracing::warn!(session_id = %id, "expired idle session");
            }
        }
        report
    }
}

/// Start the periodic expiry task. It runs independently of request handling
/// until the returned handle is aborted.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, policy: SweepPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let report = registry.sweep_expired(policy.ttl, policy.grace, Utc::now());
            if report.swept > 0 || report.marked > 0 {
                tracing::debug!(
                    marked = report.marked,
                    swept = report.swept,
                    busy = report.busy,
                    remaining = registry.len(),
                    "session sweep finished"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QuizError;
    use crate::question::Question;
    use crate::session::GameConfig;
    use pretty_assertions::assert_eq;
    use schema::{Difficulty, EffectivenessLevel, PokemonType};

    fn session(id: &str) -> GameSession {
        let question = Question::new(
            PokemonType::Fire,
            &[PokemonType::Grass],
            EffectivenessLevel::Super,
            Difficulty::Easy,
        )
        .unwrap();
        let config = GameConfig::new(Difficulty::Easy, 1).unwrap();
        GameSession::new(id.to_string(), config, vec![question]).unwrap()
    }

    const TTL: Duration = Duration::from_secs(60);
    const GRACE: Duration = Duration::from_secs(30);

    #[test]
    fn lookup_and_mutation() {
        let registry = SessionRegistry::new();
        registry.insert(session("a"));

        let started = registry.with_session("a", |s| Ok(s.start()?)).unwrap();
        assert!(registry.get("a").unwrap().lock().unwrap().has_started());
        assert!(started <= Utc::now());

        assert_eq!(
            registry.with_session("missing", |s| Ok(s.score())),
            Err(QuizError::NotFound(NotFoundError::Session(
                "missing".to_string()
            )))
        );
    }

    #[test]
    fn stale_handle_after_removal_is_not_found() {
        // Arrange
        let registry = SessionRegistry::new();
        registry.insert(session("a"));
        let stale = registry.get("a").unwrap();
        registry.remove("a");

        // Act
        let result = registry.run_locked("a", &stale, |s| Ok(s.start()?));

        // Assert
        assert_eq!(
            result,
            Err(QuizError::NotFound(NotFoundError::Session("a".to_string())))
        );
        assert!(!stale.lock().unwrap().has_started());
    }

    #[test]
    fn stale_handle_after_reinsert_leaves_the_new_session_alone() {
        let registry = SessionRegistry::new();
        let stale = registry.insert(session("a"));
        let current = registry.insert(session("a"));

        assert!(matches!(
            registry.run_locked("a", &stale, |s| Ok(s.start()?)),
            Err(QuizError::NotFound(_))
        ));
        assert!(!current.lock().unwrap().has_started());

        registry.with_session("a", |s| Ok(s.start()?)).unwrap();
        assert!(current.lock().unwrap().has_started());
        assert!(!stale.lock().unwrap().has_started());
    }

    #[test]
    fn fresh_sessions_survive_a_sweep() {
        let registry = SessionRegistry::new();
        registry.insert(session("a"));
        let report = registry.sweep_expired(TTL, GRACE, Utc::now());
        assert_eq!(report, SweepReport::default());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn idle_sessions_are_marked_then_swept() {
        let registry = SessionRegistry::new();
        registry.insert(session("a"));
        let later = Utc::now() + chrono::Duration::seconds(120);

        let first = registry.sweep_expired(TTL, GRACE, later);
        assert_eq!(first.marked, 1);
        assert_eq!(registry.len(), 1);

        let second = registry.sweep_expired(TTL, GRACE, later);
        assert_eq!(second.swept, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn marked_sessions_inside_grace_are_kept() {
        let registry = SessionRegistry::new();
        registry.insert(session("a"));
        let past_ttl = Utc::now() + chrono::Duration::seconds(75);

        registry.sweep_expired(TTL, GRACE, past_ttl);
        let report = registry.sweep_expired(TTL, GRACE, past_ttl);
        assert_eq!(report.swept, 0);
        assert!(registry.contains("a"));
    }

    #[test]
    fn busy_sessions_are_skipped() {
        let registry = SessionRegistry::new();
        let shared = registry.insert(session("a"));
        let later = Utc::now() + chrono::Duration::seconds(600);

        registry.sweep_expired(TTL, GRACE, later);
        let _in_flight = shared.lock().unwrap();
        let report = registry.sweep_expired(TTL, GRACE, later);
        assert_eq!(report.busy, 1);
        assert_eq!(report.swept, 0);
        assert!(registry.contains("a"));
    }

    #[tokio::test]
    async fn sweeper_task_clears_expired_sessions() {
        let registry = Arc::new(SessionRegistry::new());
        registry.insert(session("a"));
        let handle = spawn_sweeper(
            Arc::clone(&registry),
            SweepPolicy {
                interval: Duration::from_millis(10),
                ttl: Duration::ZERO,
                grace: Duration::ZERO,
            },
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();
        assert!(registry.is_empty());
    }
}

//! Shared fixtures for router-level tests: an in-memory backend, a static
//! token identity provider, and request helpers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use codecikgu_server::auth::{AuthError, Identity, IdentityProvider};
use codecikgu_server::db::backend::{Backend, BackendError, Result};
use codecikgu_server::models::{
    CompletionOutcome, LeaderboardRow, NewCompletion, NewEvent, Period, Profile, Role,
    XpLedgerEntry,
};
use codecikgu_server::{build_router, AppState};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

// ── In-memory backend ──────────────────────────────────────────

#[derive(Default)]
struct Store {
    profiles: HashMap<Uuid, Profile>,
    ledger: Vec<XpLedgerEntry>,
    completions: HashSet<(Uuid, String)>,
    events: Vec<NewEvent>,
}

#[derive(Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
    pub fail_awards: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_ping: AtomicBool,
}

impl MemoryBackend {
    pub fn add_profile(&self, id: Uuid, email: &str, role: Role, xp: i64) {
        let profile = Profile {
            id,
            email: email.to_lowercase(),
            role,
            xp,
            name: Some(email.split('@').next().unwrap_or(email).to_string()),
            sekolah: Some("SMK Seri Bintang".into()),
            tingkatan: Some("4".into()),
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().profiles.insert(id, profile);
    }

    pub fn profile_xp(&self, id: Uuid) -> Option<i64> {
        self.store.lock().unwrap().profiles.get(&id).map(|p| p.xp)
    }

    pub fn ledger_for(&self, id: Uuid) -> Vec<XpLedgerEntry> {
        self.store
            .lock()
            .unwrap()
            .ledger
            .iter()
            .filter(|e| e.user_id == id)
            .cloned()
            .collect()
    }

    pub fn ledger_len(&self) -> usize {
        self.store.lock().unwrap().ledger.len()
    }

    pub fn completion_count(&self) -> usize {
        self.store.lock().unwrap().completions.len()
    }

    pub fn events(&self) -> Vec<NewEvent> {
        self.store.lock().unwrap().events.clone()
    }

    /// Ledger row dated in the past, with the profile total kept in step.
    pub fn backdated_award(&self, id: Uuid, amount: i32, days_ago: i64) {
        self.award_at(id, amount, Utc::now() - Duration::days(days_ago));
    }

    /// Ledger row with an explicit timestamp, with the profile total kept in step.
    pub fn award_at(&self, id: Uuid, amount: i32, at: DateTime<Utc>) {
        let mut store = self.store.lock().unwrap();
        Self::apply_award(&mut store, id, "seed", amount, at);
    }

    fn apply_award(
        store: &mut Store,
        user_id: Uuid,
        activity: &str,
        amount: i32,
        at: DateTime<Utc>,
    ) -> Option<i64> {
        let profile = store.profiles.get_mut(&user_id)?;
        profile.xp += i64::from(amount);
        let new_xp = profile.xp;
        let next_id = store.ledger.len() as i64 + 1;
        store.ledger.push(XpLedgerEntry {
            id: next_id,
            user_id,
            activity: activity.to_string(),
            amount,
            created_at: at,
        });
        Some(new_xp)
    }

    fn unavailable(what: &str) -> BackendError {
        BackendError::Other(anyhow::anyhow!("{what}: connection refused"))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(Self::unavailable("ping"));
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.store.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn award_xp(&self, user_id: Uuid, activity: &str, amount: i32) -> Result<Option<i64>> {
        if self.fail_awards.load(Ordering::SeqCst) {
            return Err(Self::unavailable("award_xp"));
        }
        let mut store = self.store.lock().unwrap();
        Ok(Self::apply_award(&mut store, user_id, activity, amount, Utc::now()))
    }

    async fn complete_activity(&self, completion: &NewCompletion) -> Result<CompletionOutcome> {
        // One lock over check, insert and award, like the single Postgres transaction.
        let mut store = self.store.lock().unwrap();
        let key = (completion.user_id, completion.activity_key.clone());
        if store.completions.contains(&key) {
            return Ok(CompletionOutcome::Duplicate);
        }
        if self.fail_awards.load(Ordering::SeqCst) {
            return Err(Self::unavailable("complete_activity"));
        }
        let Some(new_xp) = Self::apply_award(
            &mut store,
            completion.user_id,
            &completion.activity_key,
            completion.xp,
            Utc::now(),
        ) else {
            return Ok(CompletionOutcome::MissingProfile);
        };
        store.completions.insert(key);
        Ok(CompletionOutcome::Awarded { new_xp })
    }

    async fn log_event(&self, event: &NewEvent) -> Result<()> {
        self.store.lock().unwrap().events.push(event.clone());
        Ok(())
    }

    async fn leaderboard(&self, period: Period, limit: u32) -> Result<Vec<LeaderboardRow>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable("get_leaderboard"));
        }
        let store = self.store.lock().unwrap();
        let since: Option<DateTime<Utc>> = match period {
            Period::Weekly => Some(Utc::now() - Duration::days(7)),
            Period::Monthly => Some(Utc::now() - Duration::days(30)),
            Period::All => None,
        };

        let mut totals: HashMap<Uuid, (i64, Option<DateTime<Utc>>)> = HashMap::new();
        for entry in &store.ledger {
            if since.is_some_and(|since| entry.created_at < since) {
                continue;
            }
            let slot = totals.entry(entry.user_id).or_default();
            slot.0 += i64::from(entry.amount);
            slot.1 = slot.1.max(Some(entry.created_at));
        }

        let mut ranked: Vec<(LeaderboardRow, Option<DateTime<Utc>>)> = store
            .profiles
            .values()
            .filter_map(|p| {
                let (windowed, last_award) = totals.get(&p.id).copied().unwrap_or_default();
                let xp = if since.is_some() { windowed } else { p.xp };
                (xp > 0).then(|| {
                    let row = LeaderboardRow {
                        user_id: p.id,
                        name: p.name.clone(),
                        email: p.email.clone(),
                        xp,
                    };
                    (row, last_award)
                })
            })
            .collect();

        // XP descending, then earliest last award (none last), then user id.
        ranked.sort_by(|(a, a_last), (b, b_last)| {
            b.xp.cmp(&a.xp)
                .then(a_last.is_none().cmp(&b_last.is_none()))
                .then(a_last.cmp(b_last))
                .then(a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(limit as usize);
        Ok(ranked.into_iter().map(|(row, _)| row).collect())
    }
}

// ── Identity ───────────────────────────────────────────────────

/// Maps fixed bearer tokens to identities.
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn with_user(mut self, token: &str, id: Uuid) -> Self {
        self.tokens.insert(
            token.to_string(),
            Identity {
                id,
                email: Some(format!("{token}@sekolah.edu.my")),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self, token: &str) -> std::result::Result<Option<Identity>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }
}

// ── App + requests ─────────────────────────────────────────────

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemoryBackend>,
}

pub fn test_app(backend: Arc<MemoryBackend>, identity: StaticIdentityProvider) -> TestApp {
    test_app_with_limit(backend, identity, 1_000)
}

pub fn test_app_with_limit(
    backend: Arc<MemoryBackend>,
    identity: StaticIdentityProvider,
    per_minute: u32,
) -> TestApp {
    let state = AppState::new(
        backend.clone(),
        Arc::new(identity),
        NonZeroU32::new(per_minute).unwrap(),
    );
    TestApp {
        router: build_router(state),
        backend,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let authorization = token.map(|token| format!("Bearer {token}"));
        self.request_with_authorization(method, uri, authorization.as_deref(), body)
            .await
    }

    /// Sends the `Authorization` header exactly as given.
    pub async fn request_with_authorization(
        &self,
        method: &str,
        uri: &str,
        authorization: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let resp = self.request("POST", uri, token, Some(body)).await;
        let status = resp.status();
        (status, body_json(resp).await)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let resp = self.request("GET", uri, token, None).await;
        let status = resp.status();
        (status, body_json(resp).await)
    }
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(
        |_| serde_json::json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }),
    )
}

// Detached side effects of USSD interactions
//
// The USSD reply never waits on anything here. Each effect runs in its own
// task, bounded by the shared limiter, and reports failure only through logs
// or the fallback sink.

pub mod fallback;
pub mod message;

pub use fallback::{FallbackRecord, FallbackSink};

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::{ConcurrencyLimiter, MenteeSetup, NotificationSink, ProfileSink, normalize_phone};
use crate::config::repository::mentees::{self, NewMentee};
use crate::services::matching::{self, MatchOutcome};
use crate::ussd::menu::{Language, RegistrationDraft};

/// Handles to the tasks spawned for one interaction.
/// Dropping it detaches the tasks; `join` waits for them and logs any panic.
#[derive(Debug, Default)]
pub struct DispatchHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl DispatchHandle {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn join(self) {
        for joined in futures::future::join_all(self.tasks).await {
            if let Err(e) = joined {
                error!("Side-effect task panicked: {}", e);
            }
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    pool: SqlitePool,
    profiles: Arc<dyn ProfileSink>,
    notifier: Arc<dyn NotificationSink>,
    fallback: FallbackSink,
    limiter: ConcurrencyLimiter,
    resource_base_url: Arc<str>,
}

impl Dispatcher {
    pub fn new(
        pool: SqlitePool,
        profiles: Arc<dyn ProfileSink>,
        notifier: Arc<dyn NotificationSink>,
        fallback: FallbackSink,
    ) -> Self {
        Self {
            pool,
            profiles,
            notifier,
            fallback,
            limiter: ConcurrencyLimiter::new(Default::default()),
            resource_base_url: Arc::from(crate::config::DEFAULT_RESOURCE_BASE_URL),
        }
    }

    pub fn with_limiter(mut self, limiter: ConcurrencyLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_resource_base_url(mut self, url: &str) -> Self {
        self.resource_base_url = Arc::from(url);
        self
    }

    pub fn fallback(&self) -> &FallbackSink {
        &self.fallback
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fire off everything a completed registration triggers:
    /// profile persistence, the welcome SMS, and a local match attempt.
    pub fn dispatch_registration(
        &self,
        phone_number: &str,
        draft: RegistrationDraft,
    ) -> DispatchHandle {
        let phone = normalize_phone(phone_number);
        let mut tasks = Vec::with_capacity(3);

        let setup = MenteeSetup::from_draft(&draft);
        let this = self.clone();
        let owner = phone.clone();
        tasks.push(tokio::spawn(async move {
            this.persist_profile(&owner, setup).await;
        }));

        if phone.is_empty() {
            warn!(
                "Registration for {:?} has no phone number; skipping SMS and matching",
                draft.name
            );
            return DispatchHandle { tasks };
        }

        let welcome = message::welcome_message(&draft, &self.resource_base_url);
        let this = self.clone();
        let to = phone.clone();
        tasks.push(tokio::spawn(async move {
            this.notify(&to, &welcome).await;
        }));

        let this = self.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = this.match_registration(&phone, &draft).await {
                error!("Matching after registration failed for {}: {:#}", phone, e);
            }
        }));

        DispatchHandle { tasks }
    }

    /// Record a language choice against an existing local profile
    pub fn dispatch_language(&self, phone_number: &str, language: Language) -> DispatchHandle {
        let phone = normalize_phone(phone_number);
        if phone.is_empty() {
            debug!("Language choice without phone number ignored");
            return DispatchHandle::default();
        }

        let pool = self.pool.clone();
        let task = tokio::spawn(async move {
            match mentees::set_language(&pool, &phone, language.code()).await {
                Ok(true) => info!("Language for {} set to {}", phone, language.code()),
                Ok(false) => debug!(
                    "No profile for {} yet; language {} not stored",
                    phone,
                    language.code()
                ),
                Err(e) => error!("Failed to store language for {}: {:#}", phone, e),
            }
        });

        DispatchHandle { tasks: vec![task] }
    }

    async fn persist_profile(&self, phone: &str, setup: MenteeSetup) {
        let result = {
            let _permit = self.limiter.acquire().await;
            self.profiles.setup_mentee(&setup).await
        };

        let Err(e) = result else {
            info!("Profile for {} stored via API", phone);
            return;
        };

        warn!("Profile API rejected registration for {}: {:#}", phone, e);
        let record = FallbackRecord {
            phone_number: phone.to_string(),
            recorded_at: Utc::now(),
            error: format!("{:#}", e),
            profile: setup,
        };
        match self.fallback.write(&record).await {
            Ok(path) => info!("Registration for {} saved to {}", phone, path.display()),
            Err(e) => error!("Registration for {} lost, fallback write failed: {:#}", phone, e),
        }
    }

    async fn notify(&self, to: &str, body: &str) {
        let _permit = self.limiter.acquire().await;
        match self.notifier.send(to, body).await {
            Ok(()) => debug!("SMS sent to {}", to),
            Err(e) => warn!("SMS to {} failed: {:#}", to, e),
        }
    }

    async fn match_registration(&self, phone: &str, draft: &RegistrationDraft) -> Result<()> {
        let setup = MenteeSetup::from_draft(draft);
        let mentee_id = mentees::upsert_mentee(
            &self.pool,
            &NewMentee {
                user_ref: phone.to_string(),
                name: setup.name,
                age: setup.age,
                county: setup.county,
                device: setup.device,
                interests: setup.interests,
                communication_preference: setup.communication_preference,
            },
        )
        .await?;

        match matching::match_mentee(&self.pool, mentee_id).await? {
            Some(MatchOutcome::Matched(matched)) => {
                let body = message::mentor_assigned_message(&draft.name, &matched.mentor);
                self.notify(phone, &body).await;
            }
            Some(MatchOutcome::AlreadyMatched(existing)) => {
                debug!("{} re-registered; keeping mentorship {}", phone, existing.id)
            }
            Some(MatchOutcome::NotFound) => debug!("No mentor available yet for {}", phone),
            None => warn!("Mentee {} vanished before matching", mentee_id),
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Retry every pending fallback record against the profile sink.
/// Delivered records are removed; failures stay on disk for the next run.
pub async fn replay_fallback(
    fallback: &FallbackSink,
    profiles: &dyn ProfileSink,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for path in fallback.pending().await? {
        let record = match fallback.read(&path).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable fallback file: {:#}", e);
                summary.failed += 1;
                continue;
            }
        };

        match profiles.setup_mentee(&record.profile).await {
            Ok(()) => {
                fallback.remove(&path).await?;
                summary.delivered += 1;
            }
            Err(e) => {
                warn!("Replay for {} failed: {:#}", record.phone_number, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::repository::{connect_in_memory, mentors, mentorships};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProfiles {
        fail: bool,
        calls: Mutex<Vec<MenteeSetup>>,
    }

    #[async_trait]
    impl ProfileSink for RecordingProfiles {
        async fn setup_mentee(&self, profile: &MenteeSetup) -> Result<()> {
            self.calls.lock().unwrap().push(profile.clone());
            if self.fail {
                bail!("profile API returned 503");
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn send(&self, to: &str, message: &str) -> Result<()> {
            self.sent.lock().unwrap().push((to.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn draft() -> RegistrationDraft {
        RegistrationDraft {
            name: "Ann".to_string(),
            age: 23,
            county: "Nairobi".to_string(),
            interests: vec!["Coding".to_string(), "Graphics".to_string()],
        }
    }

    async fn dispatcher(
        fail_api: bool,
    ) -> (Dispatcher, Arc<RecordingProfiles>, Arc<RecordingNotifier>, SqlitePool) {
        let pool = connect_in_memory().await.unwrap();
        let profiles = Arc::new(RecordingProfiles { fail: fail_api, ..Default::default() });
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = Dispatcher::new(
            pool.clone(),
            profiles.clone(),
            notifier.clone(),
            FallbackSink::new(fallback::scratch_dir()),
        )
        .with_resource_base_url("https://mentors.example/resources");
        (dispatcher, profiles, notifier, pool)
    }

    #[tokio::test]
    async fn test_registration_persists_and_welcomes() {
        let (dispatcher, profiles, notifier, pool) = dispatcher(false).await;

        let handle = dispatcher.dispatch_registration("254700000001", draft());
        assert_eq!(handle.len(), 3);
        handle.join().await;

        let calls = profiles.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].device, "phone");
        assert_eq!(calls[0].communication_preference, "ussd");

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+254700000001");
        assert!(sent[0].1.contains("https://mentors.example/resources/coding"));

        let stored = mentees::get_mentee_by_ref(&pool, "+254700000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.interests, vec!["Coding", "Graphics"]);
        assert!(dispatcher.fallback().pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_failure_lands_in_fallback() {
        let (dispatcher, _profiles, notifier, _pool) = dispatcher(true).await;

        dispatcher.dispatch_registration("+254700000002", draft()).join().await;

        let pending = dispatcher.fallback().pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        let record = dispatcher.fallback().read(&pending[0]).await.unwrap();
        assert_eq!(record.phone_number, "+254700000002");
        assert_eq!(record.profile.name, "Ann");
        assert!(record.error.contains("503"));

        // Notification still goes out
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
        let _ = tokio::fs::remove_dir_all(dispatcher.fallback().dir()).await;
    }

    async fn graphics_mentor(pool: &SqlitePool, capacity: u32) -> i64 {
        let mentor = mentors::sample("m1", &["Nairobi"], &["Graphics"], capacity);
        mentors::add_mentor(pool, &mentor).await.unwrap()
    }

    #[tokio::test]
    async fn test_registration_matches_and_names_mentor() {
        let (dispatcher, _profiles, notifier, pool) = dispatcher(false).await;
        let mentor_id = graphics_mentor(&pool, 2).await;

        dispatcher.dispatch_registration("+254700000003", draft()).join().await;

        assert_eq!(mentorships::count_for_mentor(&pool, mentor_id).await.unwrap(), 1);
        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|(_, body)| body.contains("matched with mentor")));
    }

    #[tokio::test]
    async fn test_repeat_registration_keeps_one_mentorship() {
        let (dispatcher, profiles, notifier, pool) = dispatcher(false).await;
        let mentor_id = graphics_mentor(&pool, 3).await;

        for _ in 0..3 {
            dispatcher.dispatch_registration("254700000007", draft()).join().await;
        }

        let stored = mentors::get_mentor(&pool, mentor_id).await.unwrap().unwrap();
        assert_eq!(stored.mentees_count, 1);
        assert_eq!(mentorships::count_for_mentor(&pool, mentor_id).await.unwrap(), 1);

        // Every registration still reaches the API and gets a welcome
        assert_eq!(profiles.calls.lock().unwrap().len(), 3);
        let sent = notifier.sent.lock().unwrap().clone();
        let assigned = sent.iter().filter(|(_, body)| body.contains("matched with mentor"));
        assert_eq!(assigned.count(), 1);
        assert_eq!(sent.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_phone_only_persists() {
        let (dispatcher, profiles, notifier, _pool) = dispatcher(false).await;

        let handle = dispatcher.dispatch_registration("  ", draft());
        assert_eq!(handle.len(), 1);
        handle.join().await;

        assert_eq!(profiles.calls.lock().unwrap().len(), 1);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_language_updates_existing_profile_only() {
        let (dispatcher, _profiles, _notifier, pool) = dispatcher(false).await;
        mentees::upsert_mentee(&pool, &mentees::sample("+254700000004", "Kisumu", &["Coding"]))
            .await
            .unwrap();

        dispatcher.dispatch_language("254700000004", Language::Swahili).join().await;
        dispatcher.dispatch_language("254700000005", Language::Swahili).join().await;

        let stored = mentees::get_mentee_by_ref(&pool, "+254700000004")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.language, "sw");
        let absent = mentees::get_mentee_by_ref(&pool, "+254700000005").await.unwrap();
        assert!(absent.is_none());
        assert!(dispatcher.dispatch_language("", Language::English).is_empty());
    }

    #[tokio::test]
    async fn test_replay_delivers_and_clears() {
        let (dispatcher, _profiles, _notifier, _pool) = dispatcher(true).await;
        dispatcher.dispatch_registration("+254700000006", draft()).join().await;
        assert_eq!(dispatcher.fallback().pending().await.unwrap().len(), 1);

        let still_down = RecordingProfiles { fail: true, ..Default::default() };
        let summary = replay_fallback(dispatcher.fallback(), &still_down).await.unwrap();
        assert_eq!(summary, ReplaySummary { delivered: 0, failed: 1 });

        let back_up = RecordingProfiles::default();
        let summary = replay_fallback(dispatcher.fallback(), &back_up).await.unwrap();
        assert_eq!(summary, ReplaySummary { delivered: 1, failed: 0 });
        assert_eq!(back_up.calls.lock().unwrap()[0].name, "Ann");
        assert!(dispatcher.fallback().pending().await.unwrap().is_empty());
        let _ = tokio::fs::remove_dir_all(dispatcher.fallback().dir()).await;
    }
}

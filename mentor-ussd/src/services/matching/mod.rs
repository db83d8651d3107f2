// Matching service for pairing mentees with mentors
//
// Eligibility and selection live in `core` as pure functions; this module
// applies the selection to storage so that the load increment and the
// mentorship record are committed together or not at all.

pub mod core;
pub mod models;

// Re-export commonly used types
pub use models::{MatchOutcome, MatchRequest, MatchedMentor};

use anyhow::{Context, Result};
use log::{debug, info};
use sqlx::SqlitePool;

use crate::config::repository::{mentees, mentors, mentorships};

/// Pick a random eligible mentor and record the mentorship.
///
/// Candidates are read outside the transaction; the slot itself is taken with
/// a compare-and-increment inside it. A candidate that filled up in between is
/// dropped and another is drawn, so concurrent matches never overbook.
///
/// A mentee holds at most one active mentorship. The check runs after the slot
/// is reserved, while the transaction holds the write lock, so two concurrent
/// requests for the same mentee cannot both commit.
pub async fn match_mentor(pool: &SqlitePool, request: &MatchRequest) -> Result<MatchOutcome> {
    let candidates = mentors::list_available_mentors(pool).await?;
    let mut eligible: Vec<mentors::Mentor> =
        core::eligible_mentors(&candidates, &request.location, &request.interests)
            .into_iter()
            .cloned()
            .collect();

    debug!(
        "Matching mentee {}: {} candidates, {} eligible",
        request.mentee_id,
        candidates.len(),
        eligible.len()
    );

    loop {
        // ThreadRng is not Send; keep it out of any await
        let picked = core::pick_index(eligible.len(), &mut rand::rng());
        let Some(idx) = picked else {
            info!("No eligible mentor for mentee {}", request.mentee_id);
            return Ok(MatchOutcome::NotFound);
        };
        let mut mentor = eligible.swap_remove(idx);

        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        if !mentors::try_reserve_slot(&mut *tx, mentor.id).await? {
            tx.rollback().await.context("Failed to roll back transaction")?;
            debug!("Mentor {} filled up before reservation, redrawing", mentor.id);
            continue;
        }

        if let Some(existing) = mentorships::active_for_mentee(&mut *tx, request.mentee_id).await? {
            tx.rollback().await.context("Failed to roll back transaction")?;
            info!(
                "Mentee {} already has active mentorship {}",
                request.mentee_id, existing.id
            );
            return Ok(MatchOutcome::AlreadyMatched(existing));
        }

        let mentorship =
            mentorships::insert_mentorship(&mut *tx, request.mentee_id, mentor.id).await?;
        tx.commit().await.context("Failed to commit transaction")?;

        mentor.mentees_count += 1;
        info!(
            "Matched mentee {} with mentor {} ({}/{})",
            request.mentee_id, mentor.id, mentor.mentees_count, mentor.max_mentees
        );
        return Ok(MatchOutcome::Matched(MatchedMentor { mentor, mentorship }));
    }
}

/// Match a stored mentee using their county and interests.
/// Returns None when the mentee does not exist.
pub async fn match_mentee(pool: &SqlitePool, mentee_id: i64) -> Result<Option<MatchOutcome>> {
    let Some(mentee) = mentees::get_mentee(pool, mentee_id).await? else {
        return Ok(None);
    };

    let request = MatchRequest {
        mentee_id: mentee.id,
        location: mentee.county,
        interests: mentee.interests,
    };
    match_mentor(pool, &request).await.map(Some)
}

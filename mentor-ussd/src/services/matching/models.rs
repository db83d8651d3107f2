use serde::Serialize;

use crate::config::repository::mentors::Mentor;
use crate::config::repository::mentorships::Mentorship;

/// Who is asking for a mentor, and what they need
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub mentee_id: i64,
    /// Requester's location; compared for exact equality with mentor counties
    pub location: String,
    /// Requester's interest tags
    pub interests: Vec<String>,
}

/// Mentor assigned by a successful match, with the load after assignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedMentor {
    pub mentor: Mentor,
    pub mentorship: Mentorship,
}

/// Result of a match attempt. `NotFound` is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(MatchedMentor),
    /// The mentee already holds this active mentorship; nothing changed
    AlreadyMatched(Mentorship),
    NotFound,
}

#[cfg(test)]
impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn mentor_ref(&self) -> Option<i64> {
        match self {
            MatchOutcome::Matched(matched) => Some(matched.mentor.id),
            MatchOutcome::AlreadyMatched(existing) => Some(existing.mentor_id),
            MatchOutcome::NotFound => None,
        }
    }
}

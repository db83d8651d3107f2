//! Core matching functions
//! Pure eligibility filtering and random selection; no storage access.

use rand::Rng;

use crate::config::repository::mentors::Mentor;
use crate::ussd::catalog::UNKNOWN;

/// Mentor lists the requester's location among the counties they serve.
/// Exact match only; there is no notion of neighbouring locations.
pub fn serves_location(mentor: &Mentor, location: &str) -> bool {
    location != UNKNOWN && mentor.counties.iter().any(|county| county == location)
}

/// At least one requester interest is among the mentor's expertise tags.
/// `Unknown` placeholders never count towards the overlap.
pub fn shares_interest(mentor: &Mentor, interests: &[String]) -> bool {
    interests
        .iter()
        .filter(|interest| interest.as_str() != UNKNOWN)
        .any(|interest| mentor.expertise.contains(interest))
}

/// Location, then capacity, then interest overlap
pub fn is_eligible(mentor: &Mentor, location: &str, interests: &[String]) -> bool {
    serves_location(mentor, location) && mentor.has_capacity() && shares_interest(mentor, interests)
}

/// Candidates passing every eligibility filter, in input order
pub fn eligible_mentors<'a>(
    candidates: &'a [Mentor],
    location: &str,
    interests: &[String],
) -> Vec<&'a Mentor> {
    candidates
        .iter()
        .filter(|mentor| is_eligible(mentor, location, interests))
        .collect()
}

/// Uniform choice among `len` eligible candidates; no weighting by load or history
pub fn pick_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(rng.random_range(0..len))
    }
}

//! SMS bodies sent after USSD interactions

use crate::config::repository::mentors::Mentor;
use crate::ussd::catalog::resource_slug;
use crate::ussd::menu::RegistrationDraft;

/// Interest categories linked in the welcome SMS
pub const MAX_LINKED_CATEGORIES: usize = 3;

fn greeting(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        "Hi there".to_string()
    } else {
        format!("Hi {}", name)
    }
}

/// Welcome SMS linking up to three of the caller's recognised interests to their resource pages
pub fn welcome_message(draft: &RegistrationDraft, resource_base_url: &str) -> String {
    let base = resource_base_url.trim_end_matches('/');
    let links: Vec<String> = draft
        .known_interests()
        .into_iter()
        .take(MAX_LINKED_CATEGORIES)
        .map(|category| format!("{}: {}/{}", category, base, resource_slug(category)))
        .collect();

    if links.is_empty() {
        return format!(
            "{}, welcome to the Mentorship Platform! We'll match you with a mentor soon.",
            greeting(&draft.name)
        );
    }

    format!(
        "{}, welcome to the Mentorship Platform! Start learning:\n{}",
        greeting(&draft.name),
        links.join("\n")
    )
}

pub fn mentor_assigned_message(mentee_name: &str, mentor: &Mentor) -> String {
    format!(
        "{}, you have been matched with mentor {}. They will reach out to you soon.",
        greeting(mentee_name),
        mentor.name
    )
}

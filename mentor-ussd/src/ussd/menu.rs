//! USSD menu state machine
//!
//! The server keeps no session state: every response is a pure function of the
//! transcript. The first token picks a flow, the remaining tokens are matched
//! against that flow's fixed-depth shape. Anything else is a terminal
//! "Invalid option".

use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{
    self, CATEGORIES, LOCATIONS, MAX_RESOURCE_LINES, Namespace, ResourceCache, UNKNOWN,
};
use super::codec::{Transcript, UssdResponse, split_choices};

pub const WELCOME: &str = "Welcome to the Mentorship Platform\n\
                           1. Register\n\
                           2. Set language (EN/SW)\n\
                           3. View tech pathways\n\
                           4. Access resources";
pub const INVALID_OPTION: &str = "Invalid option";
pub const INVALID_AGE: &str = "Invalid age. Please dial again to register";
pub const REGISTERED: &str = "Thank you for registering! We'll match you with a mentor soon.";

/// Age recorded when the caller's input is not a number and the policy substitutes
pub const AGE_SENTINEL: u32 = 0;

/// Top-level menu branches, selected by the first token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Register,
    Language,
    Pathway,
    Resources,
}

impl Flow {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "1" => Some(Flow::Register),
            "2" => Some(Flow::Language),
            "3" => Some(Flow::Pathway),
            "4" => Some(Flow::Resources),
            _ => None,
        }
    }
}

/// What to do when the age token does not parse as a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgePolicy {
    /// Record [`AGE_SENTINEL`] and keep the registration going
    #[default]
    Substitute,
    /// End the session with [`INVALID_AGE`]
    Reject,
}

impl AgePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "substitute" => Some(AgePolicy::Substitute),
            "reject" => Some(AgePolicy::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "sw")]
    Swahili,
}

impl Language {
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "1" => Some(Language::English),
            "2" => Some(Language::Swahili),
            _ => None,
        }
    }

    /// Code stored on the mentee profile
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Swahili => "sw",
        }
    }

    fn confirmation(&self) -> &'static str {
        match self {
            Language::English => "Language set to English",
            Language::Swahili => "Lugha imewekwa kwa Kiswahili",
        }
    }
}

/// Registration assembled from a completed transcript; never stored by the menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDraft {
    pub name: String,
    pub age: u32,
    pub county: String,
    /// One entry per submitted choice, [`UNKNOWN`] where the code was not recognised
    pub interests: Vec<String>,
}

impl RegistrationDraft {
    /// Recognised interests in submission order, without repeats
    pub fn known_interests(&self) -> Vec<&str> {
        let mut known: Vec<&str> = Vec::new();
        for interest in &self.interests {
            if interest != UNKNOWN && !known.contains(&interest.as_str()) {
                known.push(interest);
            }
        }
        known
    }
}

/// Side effect the caller of the menu should launch after responding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    None,
    Register(RegistrationDraft),
    SetLanguage(Language),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOutcome {
    pub response: UssdResponse,
    pub action: MenuAction,
}

impl MenuOutcome {
    fn prompt(body: impl Into<String>) -> Self {
        Self {
            response: UssdResponse::con(body),
            action: MenuAction::None,
        }
    }

    fn done(body: impl Into<String>) -> Self {
        Self {
            response: UssdResponse::end(body),
            action: MenuAction::None,
        }
    }

    fn invalid() -> Self {
        Self::done(INVALID_OPTION)
    }
}

/// Maps a transcript to its response. Cheap to clone, safe to share across requests.
#[derive(Debug, Clone)]
pub struct Menu {
    resources: Arc<ResourceCache>,
    age_policy: AgePolicy,
}

impl Menu {
    pub fn new(resources: Arc<ResourceCache>, age_policy: AgePolicy) -> Self {
        Self {
            resources,
            age_policy,
        }
    }

    pub fn age_policy(&self) -> AgePolicy {
        self.age_policy
    }

    pub fn respond(&self, transcript: &Transcript) -> MenuOutcome {
        let Some((first, rest)) = transcript.tokens().split_first() else {
            return MenuOutcome::prompt(WELCOME);
        };

        match Flow::from_token(first) {
            Some(Flow::Register) => self.register(rest),
            Some(Flow::Language) => self.language(rest),
            Some(Flow::Pathway) => self.browse(Namespace::Pathway, rest),
            Some(Flow::Resources) => self.browse(Namespace::Resources, rest),
            None => MenuOutcome::invalid(),
        }
    }

    fn register(&self, steps: &[String]) -> MenuOutcome {
        match steps {
            [] => MenuOutcome::prompt("Please enter your name"),
            [_name] => MenuOutcome::prompt("Enter your age"),
            [_name, age] => match self.parse_age(age) {
                Some(_) => MenuOutcome::prompt(format!(
                    "Select your county\n{}",
                    catalog::menu_listing(LOCATIONS)
                )),
                None => MenuOutcome::done(INVALID_AGE),
            },
            [_name, age, _county] => match self.parse_age(age) {
                Some(_) => MenuOutcome::prompt(format!(
                    "Select your interests (separated by commas)\n{}",
                    catalog::menu_listing(CATEGORIES)
                )),
                None => MenuOutcome::done(INVALID_AGE),
            },
            [name, age, county, interests] => {
                let Some(age) = self.parse_age(age) else {
                    return MenuOutcome::done(INVALID_AGE);
                };
                let draft = RegistrationDraft {
                    name: name.clone(),
                    age,
                    county: catalog::location_name(county).to_string(),
                    interests: split_choices(interests)
                        .into_iter()
                        .map(|choice| catalog::category_name(choice).to_string())
                        .collect(),
                };
                MenuOutcome {
                    response: UssdResponse::end(REGISTERED),
                    action: MenuAction::Register(draft),
                }
            }
            _ => MenuOutcome::invalid(),
        }
    }

    fn parse_age(&self, raw: &str) -> Option<u32> {
        match raw.trim().parse::<u32>() {
            Ok(age) => Some(age),
            Err(_) => match self.age_policy {
                AgePolicy::Substitute => {
                    warn!("Unparseable age {:?}, substituting {}", raw, AGE_SENTINEL);
                    Some(AGE_SENTINEL)
                }
                AgePolicy::Reject => None,
            },
        }
    }

    fn language(&self, steps: &[String]) -> MenuOutcome {
        match steps {
            [] => MenuOutcome::prompt("Select language\n1. English\n2. Swahili"),
            [choice] => match Language::from_choice(choice) {
                Some(language) => MenuOutcome {
                    response: UssdResponse::end(language.confirmation()),
                    action: MenuAction::SetLanguage(language),
                },
                None => MenuOutcome::invalid(),
            },
            _ => MenuOutcome::invalid(),
        }
    }

    fn browse(&self, namespace: Namespace, steps: &[String]) -> MenuOutcome {
        match steps {
            [] => {
                let title = match namespace {
                    Namespace::Pathway => "Select your tech pathway",
                    Namespace::Resources => "Select category",
                };
                MenuOutcome::prompt(format!("{}\n{}", title, catalog::menu_listing(CATEGORIES)))
            }
            [choice] => {
                let category = catalog::category_name(choice);
                let lines = self.resources.lookup(namespace, category);
                let body = lines
                    .iter()
                    .take(MAX_RESOURCE_LINES)
                    .enumerate()
                    .map(|(i, line)| format!("{}. {}", i + 1, line))
                    .collect::<Vec<_>>()
                    .join("\n");
                MenuOutcome::done(format!("{} Resources:\n{}", category, body))
            }
            _ => MenuOutcome::invalid(),
        }
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new(Arc::new(ResourceCache::builtin()), AgePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ussd::catalog::NO_RESOURCES;

    fn render(menu: &Menu, text: &str) -> String {
        menu.respond(&Transcript::parse(text)).response.to_string()
    }

    #[test]
    fn test_welcome_menu() {
        assert_eq!(
            render(&Menu::default(), ""),
            "CON Welcome to the Mentorship Platform\n1. Register\n2. Set language (EN/SW)\n3. View tech pathways\n4. Access resources"
        );
    }

    #[test]
    fn test_registration_step_by_step() {
        let menu = Menu::default();
        let expected = [
            ("1", "CON Please enter your name"),
            ("Name", "CON Enter your age"),
            (
                "23",
                "CON Select your county\n1. Nairobi\n2. Mombasa\n3. Kisumu\n4. Kakamega\n5. Busia",
            ),
            (
                "1",
                "CON Select your interests (separated by commas)\n1. Coding\n2. Graphics\n3. Animation\n4. Design",
            ),
            (
                "1,2",
                "END Thank you for registering! We'll match you with a mentor soon.",
            ),
        ];

        let mut transcript = Transcript::default();
        for (input, response) in expected {
            transcript = transcript.extended(input);
            let outcome = menu.respond(&transcript);
            assert_eq!(outcome.response.to_string(), response, "at {}", transcript.to_text());
        }
        assert_eq!(transcript.to_text(), "1*Name*23*1*1,2");

        let outcome = menu.respond(&transcript);
        assert!(outcome.response.is_terminal());
        assert_eq!(
            outcome.action,
            MenuAction::Register(RegistrationDraft {
                name: "Name".to_string(),
                age: 23,
                county: "Nairobi".to_string(),
                interests: vec!["Coding".to_string(), "Graphics".to_string()],
            })
        );
    }

    #[test]
    fn test_only_final_registration_step_is_terminal() {
        let menu = Menu::default();
        for text in ["1", "1*Ann", "1*Ann*30", "1*Ann*30*2"] {
            let outcome = menu.respond(&Transcript::parse(text));
            assert!(!outcome.response.is_terminal(), "{}", text);
            assert_eq!(outcome.action, MenuAction::None);
        }
    }

    #[test]
    fn test_unknown_location_still_registers() {
        let outcome = Menu::default().respond(&Transcript::parse("1*Ann*30*9*1"));
        assert_eq!(outcome.response, UssdResponse::end(REGISTERED));
        match outcome.action {
            MenuAction::Register(draft) => {
                assert_eq!(draft.county, UNKNOWN);
                assert_eq!(draft.interests, vec!["Coding"]);
            }
            other => panic!("expected registration, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_interests_keep_position() {
        let outcome = Menu::default().respond(&Transcript::parse("1*Ann*30*2*4, 7,1,4"));
        let MenuAction::Register(draft) = outcome.action else {
            panic!("expected registration");
        };
        assert_eq!(draft.interests, vec!["Design", UNKNOWN, "Coding", "Design"]);
        assert_eq!(draft.known_interests(), vec!["Design", "Coding"]);
    }

    #[test]
    fn test_age_substitution_policy() {
        let menu = Menu::default();
        assert_eq!(menu.age_policy(), AgePolicy::Substitute);
        assert!(render(&menu, "1*Ann*thirty").starts_with("CON Select your county"));

        let outcome = menu.respond(&Transcript::parse("1*Ann*thirty*1*1"));
        let MenuAction::Register(draft) = outcome.action else {
            panic!("expected registration");
        };
        assert_eq!(draft.age, AGE_SENTINEL);
    }

    #[test]
    fn test_age_reject_policy() {
        let menu = Menu::new(Arc::new(ResourceCache::builtin()), AgePolicy::Reject);
        assert_eq!(render(&menu, "1*Ann*thirty"), format!("END {}", INVALID_AGE));
        assert_eq!(render(&menu, "1*Ann*-4*1"), format!("END {}", INVALID_AGE));

        let outcome = menu.respond(&Transcript::parse("1*Ann*thirty*1*1"));
        assert_eq!(outcome.response, UssdResponse::end(INVALID_AGE));
        assert_eq!(outcome.action, MenuAction::None);

        assert!(render(&menu, "1*Ann* 30 ").starts_with("CON Select your county"));
    }

    #[test]
    fn test_language_flow() {
        let menu = Menu::default();
        assert_eq!(render(&menu, "2"), "CON Select language\n1. English\n2. Swahili");
        assert_eq!(render(&menu, "2*1"), "END Language set to English");

        let outcome = menu.respond(&Transcript::parse("2*2"));
        assert_eq!(outcome.response.to_string(), "END Lugha imewekwa kwa Kiswahili");
        assert_eq!(outcome.action, MenuAction::SetLanguage(Language::Swahili));
    }

    #[test]
    fn test_pathway_flow() {
        let menu = Menu::default();
        assert_eq!(
            render(&menu, "3"),
            "CON Select your tech pathway\n1. Coding\n2. Graphics\n3. Animation\n4. Design"
        );
        assert_eq!(
            render(&menu, "3*1"),
            "END Coding Resources:\n1. Learn HTML basics: Start with structure\n2. CSS basics: Style your pages\n3. JavaScript intro: Add interactivity"
        );
        assert_eq!(
            render(&menu, "3*3"),
            format!("END Animation Resources:\n1. {}", NO_RESOURCES)
        );
    }

    #[test]
    fn test_resources_flow() {
        let menu = Menu::default();
        assert!(render(&menu, "4").starts_with("CON Select category\n1. Coding"));
        assert_eq!(
            render(&menu, "4*4"),
            "END Design Resources:\n1. User experience fundamentals\n2. Interface design principles\n3. Prototyping methods"
        );
        assert_eq!(
            render(&menu, "4*8"),
            format!("END Unknown Resources:\n1. {}", NO_RESOURCES)
        );
    }

    #[test]
    fn test_resource_lines_capped_at_three() {
        let stored = crate::config::repository::resources::Resource {
            id: uuid::Uuid::new_v4(),
            title: "Rust book".to_string(),
            description: String::new(),
            tags: vec!["Coding".to_string()],
            link: None,
            sms_text: None,
            created_by: None,
            created_at: chrono::Utc::now(),
        };
        let menu = Menu::new(
            Arc::new(ResourceCache::with_stored(&[stored])),
            AgePolicy::Substitute,
        );
        let body = render(&menu, "4*1");
        assert_eq!(body.lines().count(), 4);
        assert!(!body.contains("Rust book"));
    }

    #[test]
    fn test_unmatched_shapes_are_invalid() {
        let menu = Menu::default();
        for text in [
            "5",
            "0",
            "abc",
            "*",
            "1*Ann*30*1*1*extra",
            "2*3",
            "2*1*1",
            "3*1*2",
            "4*1*1",
            "11",
        ] {
            let outcome = menu.respond(&Transcript::parse(text));
            assert_eq!(outcome.response, UssdResponse::end(INVALID_OPTION), "{}", text);
            assert_eq!(outcome.action, MenuAction::None);
        }
    }

    #[test]
    fn test_age_policy_parse() {
        assert_eq!(AgePolicy::parse("Reject"), Some(AgePolicy::Reject));
        assert_eq!(AgePolicy::parse(" substitute "), Some(AgePolicy::Substitute));
        assert_eq!(AgePolicy::parse("abort"), None);
    }
}

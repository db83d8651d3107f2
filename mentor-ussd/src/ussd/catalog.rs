//! Static lookup tables served to USSD callers
//!
//! Locations and interest categories are fixed for the lifetime of the
//! process. The resource cache is built once at startup and only read after.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::config::repository::resources::Resource;

/// Placeholder for any code that is not in a table
pub const UNKNOWN: &str = "Unknown";

/// Single line served when a category has no cached resources
pub const NO_RESOURCES: &str = "No resources available";

/// Maximum resource lines rendered on one USSD screen
pub const MAX_RESOURCE_LINES: usize = 3;

/// Location menu entries (code, county)
pub const LOCATIONS: &[(&str, &str)] = &[
    ("1", "Nairobi"),
    ("2", "Mombasa"),
    ("3", "Kisumu"),
    ("4", "Kakamega"),
    ("5", "Busia"),
];

/// Interest category menu entries (code, canonical tag)
pub const CATEGORIES: &[(&str, &str)] = &[
    ("1", "Coding"),
    ("2", "Graphics"),
    ("3", "Animation"),
    ("4", "Design"),
];

static LOCATION_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| LOCATIONS.iter().copied().collect());

static CATEGORY_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| CATEGORIES.iter().copied().collect());

/// Resolve a location code; unknown codes map to [`UNKNOWN`]
pub fn location_name(code: &str) -> &'static str {
    LOCATION_INDEX.get(code.trim()).copied().unwrap_or(UNKNOWN)
}

/// Resolve an interest code; unknown codes map to [`UNKNOWN`]
pub fn category_name(code: &str) -> &'static str {
    CATEGORY_INDEX.get(code.trim()).copied().unwrap_or(UNKNOWN)
}

/// Render table entries as a numbered USSD menu body
pub fn menu_listing(entries: &[(&str, &str)]) -> String {
    entries
        .iter()
        .map(|(code, name)| format!("{}. {}", code, name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// URL slug used to link a category to its canonical resource page
pub fn resource_slug(category: &str) -> String {
    category
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Independent key spaces for the two browsing flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Pathway,
    Resources,
}

const PATHWAY_LINES: &[(&str, &[&str])] = &[
    (
        "Coding",
        &[
            "Learn HTML basics: Start with structure",
            "CSS basics: Style your pages",
            "JavaScript intro: Add interactivity",
        ],
    ),
    (
        "Graphics",
        &[
            "Design principles",
            "Color theory basics",
            "Layout fundamentals",
        ],
    ),
];

const RESOURCE_LINES: &[(&str, &[&str])] = &[
    (
        "Coding",
        &[
            "HTML Basics - structure first",
            "CSS - make it look good",
            "JavaScript - add interactivity",
        ],
    ),
    (
        "Graphics",
        &[
            "Color Theory - understand palettes",
            "Composition - rule of thirds",
            "Typography basics",
        ],
    ),
    (
        "Animation",
        &[
            "12 Principles of Animation",
            "Frame by frame technique",
            "Tweening basics",
        ],
    ),
    (
        "Design",
        &[
            "User experience fundamentals",
            "Interface design principles",
            "Prototyping methods",
        ],
    ),
];

/// Read-only category -> content lines map, keyed per namespace
#[derive(Debug, Clone)]
pub struct ResourceCache {
    entries: HashMap<(Namespace, String), Vec<String>>,
    placeholder: Vec<String>,
}

impl ResourceCache {
    /// Cache holding only the built-in lines
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        for (namespace, table) in [
            (Namespace::Pathway, PATHWAY_LINES),
            (Namespace::Resources, RESOURCE_LINES),
        ] {
            for (category, lines) in table {
                entries.insert(
                    (namespace, category.to_string()),
                    lines.iter().map(|line| line.to_string()).collect(),
                );
            }
        }

        Self {
            entries,
            placeholder: vec![NO_RESOURCES.to_string()],
        }
    }

    /// Built-in lines plus stored resources, appended to the resources
    /// namespace under every known category they are tagged with
    pub fn with_stored(resources: &[Resource]) -> Self {
        let mut cache = Self::builtin();

        for resource in resources {
            let line = resource.ussd_line();
            for tag in &resource.tags {
                let Some((_, category)) = CATEGORIES
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(tag.trim()))
                else {
                    continue;
                };
                cache
                    .entries
                    .entry((Namespace::Resources, category.to_string()))
                    .or_default()
                    .push(line.clone());
            }
        }

        log::debug!(
            "Resource cache built with {} categories ({} stored resources)",
            cache.entries.len(),
            resources.len()
        );
        cache
    }

    /// Lines for a category; a miss returns the shared placeholder
    pub fn lookup(&self, namespace: Namespace, category: &str) -> &[String] {
        self.entries
            .get(&(namespace, category.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&self.placeholder)
    }

    #[cfg(test)]
    pub fn category_count(&self, namespace: Namespace) -> usize {
        self.entries.keys().filter(|(ns, _)| *ns == namespace).count()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(title: &str, sms_text: Option<&str>, tags: &[&str]) -> Resource {
        Resource {
            id: uuid::Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            link: None,
            sms_text: sms_text.map(str::to_string),
            created_by: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_location_lookup() {
        assert_eq!(location_name("1"), "Nairobi");
        assert_eq!(location_name("5"), "Busia");
        assert_eq!(location_name("9"), UNKNOWN);
        assert_eq!(location_name("Nairobi"), UNKNOWN);
    }

    #[test]
    fn test_category_lookup_trims() {
        assert_eq!(category_name(" 2 "), "Graphics");
        assert_eq!(category_name(""), UNKNOWN);
    }

    #[test]
    fn test_menu_listing() {
        assert_eq!(
            menu_listing(CATEGORIES),
            "1. Coding\n2. Graphics\n3. Animation\n4. Design"
        );
    }

    #[test]
    fn test_resource_slug() {
        assert_eq!(resource_slug("Coding"), "coding");
        assert_eq!(resource_slug(" Motion Graphics "), "motion-graphics");
    }

    #[test]
    fn test_lookup_returns_same_reference() {
        let cache = ResourceCache::builtin();
        let first = cache.lookup(Namespace::Resources, "Coding");
        let second = cache.lookup(Namespace::Resources, "Coding");
        assert!(std::ptr::eq(first, second));
        assert_eq!(first[0], "HTML Basics - structure first");
    }

    #[test]
    fn test_namespaces_are_separate() {
        let cache = ResourceCache::builtin();
        assert_eq!(
            cache.lookup(Namespace::Pathway, "Coding")[0],
            "Learn HTML basics: Start with structure"
        );
        assert_eq!(cache.lookup(Namespace::Pathway, "Design"), &[NO_RESOURCES]);
        assert_eq!(cache.lookup(Namespace::Resources, "Design").len(), 3);
        assert_eq!(cache.category_count(Namespace::Pathway), 2);
        assert_eq!(cache.category_count(Namespace::Resources), 4);
    }

    #[test]
    fn test_miss_returns_placeholder() {
        let cache = ResourceCache::builtin();
        let miss = cache.lookup(Namespace::Resources, UNKNOWN);
        assert_eq!(miss, &[NO_RESOURCES]);
        assert!(std::ptr::eq(miss, cache.lookup(Namespace::Pathway, "Robotics")));
    }

    #[test]
    fn test_stored_resources_append_in_order() {
        let cache = ResourceCache::with_stored(&[
            stored("Rust book", Some("Rust book - free online"), &["coding", "Systems"]),
            stored("Blender 101", None, &["Animation", "Design"]),
        ]);

        let coding = cache.lookup(Namespace::Resources, "Coding");
        assert_eq!(coding.len(), 4);
        assert_eq!(coding[3], "Rust book - free online");

        assert_eq!(cache.lookup(Namespace::Resources, "Animation")[3], "Blender 101");
        assert_eq!(cache.lookup(Namespace::Resources, "Design")[3], "Blender 101");
        // stored resources never leak into the pathway namespace
        assert_eq!(cache.lookup(Namespace::Pathway, "Animation"), &[NO_RESOURCES]);
    }
}

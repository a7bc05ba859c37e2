//! Example and template matching for in-memory queries.

use persistkit_domain::identifiable::Identifiable;
use persistkit_domain::search::{SearchMode, SearchTemplate};

/// Entity the in-memory DAO knows how to query.
pub trait Searchable: Identifiable + Clone {
    /// Whether every field populated on `example` holds the same value on
    /// `self`. Identity is compared by the DAO and can be ignored here.
    fn matches_example(&self, example: &Self) -> bool;

    /// Text values a template's search pattern is tried against.
    fn search_fields(&self) -> Vec<&str>;
}

/// Whether `candidate` satisfies both the example and the template's pattern.
/// Pagination is applied by the caller.
pub(crate) fn matches<E: Searchable>(
    candidate: &E,
    example: &E,
    template: &SearchTemplate,
) -> bool {
    if example.id().is_some_and(|id| candidate.id() != Some(id)) {
        return false;
    }

    if !candidate.matches_example(example) {
        return false;
    }

    match template.pattern() {
        None => true,
        Some(pattern) => candidate.search_fields().into_iter().any(|value| {
            text_matches(value, pattern, template.search_mode, template.case_sensitive)
        }),
    }
}

fn text_matches(value: &str, pattern: &str, mode: SearchMode, case_sensitive: bool) -> bool {
    let (value, pattern) = if case_sensitive {
        (value.to_string(), pattern.to_string())
    } else {
        (value.to_lowercase(), pattern.to_lowercase())
    };

    match mode {
        SearchMode::Equals => value == pattern,
        SearchMode::StartingLike => value.starts_with(&pattern),
        SearchMode::EndingLike => value.ends_with(&pattern),
        SearchMode::Anywhere => value.contains(&pattern),
        SearchMode::Like => {
            let value: Vec<char> = value.chars().collect();
            let pattern: Vec<char> = pattern.chars().collect();
            like(&value, &pattern)
        }
    }
}

/// `LIKE` matching: `%` stands for any run of characters, `_` for exactly one.
fn like(value: &[char], pattern: &[char]) -> bool {
    let (mut v, mut p) = (0, 0);
    // Position of the last `%` seen and the value index it was tried from.
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, v));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == value[v]) {
            v += 1;
            p += 1;
        } else if let Some((star, from)) = backtrack {
            p = star + 1;
            v = from + 1;
            backtrack = Some((star, from + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Item {
        id: Option<u64>,
        name: String,
        tag: String,
    }

    impl Identifiable for Item {
        type Id = u64;

        fn id(&self) -> Option<&u64> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }
    }

    impl Searchable for Item {
        fn matches_example(&self, example: &Self) -> bool {
            (example.name.is_empty() || self.name == example.name)
                && (example.tag.is_empty() || self.tag == example.tag)
        }

        fn search_fields(&self) -> Vec<&str> {
            vec![self.name.as_str(), self.tag.as_str()]
        }
    }

    fn item(id: u64, name: &str, tag: &str) -> Item {
        Item {
            id: Some(id),
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn should_match_every_mode() {
        assert!(text_matches("joseph", "joseph", SearchMode::Equals, true));
        assert!(!text_matches("joseph", "jo", SearchMode::Equals, true));
        assert!(text_matches("joseph", "jo", SearchMode::StartingLike, true));
        assert!(text_matches("joseph", "eph", SearchMode::EndingLike, true));
        assert!(text_matches("joseph", "sep", SearchMode::Anywhere, true));
        assert!(!text_matches("mark", "jo", SearchMode::Anywhere, true));
    }

    #[test]
    fn should_ignore_case_when_insensitive() {
        assert!(text_matches("John", "jo", SearchMode::StartingLike, false));
        assert!(!text_matches("John", "jo", SearchMode::StartingLike, true));
    }

    #[test]
    fn should_match_like_wildcards() {
        let check = |value: &str, pattern: &str| {
            text_matches(value, pattern, SearchMode::Like, true)
        };
        assert!(check("joseph", "jo%"));
        assert!(check("joseph", "%ep%"));
        assert!(check("joseph", "j_seph"));
        assert!(check("joseph", "%"));
        assert!(check("abcabd", "%abd"));
        assert!(!check("joseph", "jo_"));
        assert!(!check("joseph", "%x%"));
        assert!(!check("", "_"));
    }

    #[test]
    fn should_filter_by_example_identity() {
        let candidate = item(1, "john", "dwarf");
        let mut example = Item::default();
        example.set_id(2);

        assert!(!matches(&candidate, &example, &SearchTemplate::default()));
        example.set_id(1);
        assert!(matches(&candidate, &example, &SearchTemplate::default()));
    }

    #[test]
    fn should_filter_by_populated_example_fields() {
        let candidate = item(1, "john", "dwarf");
        let example = Item {
            tag: "elf".to_string(),
            ..Item::default()
        };
        assert!(!matches(&candidate, &example, &SearchTemplate::default()));
    }

    #[test]
    fn should_try_pattern_against_every_search_field() {
        let candidate = item(1, "john", "dwarf");
        let template = SearchTemplate::new()
            .with_search_pattern("dw")
            .with_search_mode(SearchMode::StartingLike);

        assert!(matches(&candidate, &Item::default(), &template));
    }
}

use persistkit_adapter_memory::Searchable;
use persistkit_domain::identifiable::Identifiable;

/// Sample entity stored by the demo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Character {
    pub id: Option<u64>,
    pub name: String,
    pub class: String,
    pub level: Option<u8>,
}

impl Character {
    #[must_use]
    pub fn new(name: &str, class: &str, level: u8) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            class: class.to_string(),
            level: Some(level),
        }
    }

    /// Fresh level-one adventurer with no name yet.
    #[must_use]
    pub fn recruit() -> Self {
        Self {
            class: "fighter".to_string(),
            level: Some(1),
            ..Self::default()
        }
    }
}

impl Identifiable for Character {
    type Id = u64;

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

impl Searchable for Character {
    fn matches_example(&self, example: &Self) -> bool {
        (example.name.is_empty() || self.name == example.name)
            && (example.class.is_empty() || self.class == example.class)
            && example.level.is_none_or(|level| self.level == Some(level))
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.class.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_blank_example_against_anyone() {
        let john = Character::new("john", "knight", 3);
        assert!(john.matches_example(&Character::default()));
    }

    #[test]
    fn should_match_on_every_populated_field() {
        let john = Character::new("john", "knight", 3);
        let example = Character {
            class: "knight".to_string(),
            level: Some(4),
            ..Character::default()
        };
        assert!(!john.matches_example(&example));
    }

    #[test]
    fn should_recruit_unnamed_level_one_fighter() {
        let recruit = Character::recruit();
        assert!(!recruit.is_identified());
        assert!(recruit.name.is_empty());
        assert_eq!(recruit.level, Some(1));
    }
}

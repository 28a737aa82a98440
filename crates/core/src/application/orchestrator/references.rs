// Character reference resolution

use crate::domain::{Character, CharacterReference};

/// Match declared character names against the roster.
///
/// Matching is case-insensitive and exact. Names with no roster entry, and
/// entries without a reference image, are skipped. A character matched by
/// several declared names appears once, at its first position.
pub fn resolve_references<S: AsRef<str>>(
    roster: &[Character],
    names: &[S],
) -> Vec<CharacterReference> {
    let mut matched: Vec<&Character> = Vec::new();
    for name in names {
        let Some(character) = roster.iter().find(|c| c.matches_name(name.as_ref())) else {
            continue;
        };
        if !matched.iter().any(|m| m.id == character.id) {
            matched.push(character);
        }
    }
    matched.into_iter().filter_map(Character::reference).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, name: &str, image_url: Option<&str>) -> Character {
        Character {
            id: id.into(),
            name: name.into(),
            description: format!("{name} description"),
            image_url: image_url.map(str::to_string),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_unknown_names_are_dropped() {
        let roster = vec![character("c-1", "Alice", Some("a.png"))];

        let refs = resolve_references(&roster, &["alice", "Bob"]);
        assert_eq!(
            refs,
            vec![CharacterReference {
                name: "Alice".into(),
                image_url: "a.png".into(),
            }]
        );
    }

    #[test]
    fn test_imageless_and_duplicate_matches() {
        let roster = vec![
            character("c-1", "Alice", Some("a.png")),
            character("c-2", "Bob", None),
            character("c-3", "Chen", Some("c.png")),
        ];

        let refs = resolve_references(&roster, &["Chen", "Bob", "ALICE", "chen", "alice"]);
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Chen", "Alice"]);

        let none: Vec<String> = Vec::new();
        assert!(resolve_references(&roster, &none).is_empty());
    }
}

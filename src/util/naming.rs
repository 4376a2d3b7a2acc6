//! Identifier-safe output names.

use std::collections::HashSet;

/// Fallback token for names with no usable characters.
pub const EMPTY_NAME: &str = "object";

/// Collapse a display name into an ASCII identifier token.
///
/// Non `[A-Za-z0-9_]` characters become `_`, runs of `_` collapse to one and
/// are trimmed from both ends. A leading digit gets a `_` prefix.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' {
            if last_underscore {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return EMPTY_NAME.to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Hands out unique output names within one run.
///
/// Uniqueness is case-insensitive so names stay distinct on case-folding file
/// systems. A colliding name first gets the object's sanitized identifier
/// appended; if that is taken too, a counter is appended.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a unique token for an object `name` with identifier `id`.
    pub fn allocate(&mut self, name: &str, id: &str) -> String {
        let base = sanitize_identifier(name);
        if self.claim(&base) {
            return base;
        }

        let with_id = format!("{base}_{}", sanitize_identifier(id));
        if self.claim(&with_id) {
            return with_id;
        }

        let mut n = 2usize;
        loop {
            let candidate = format!("{with_id}_{n}");
            if self.claim(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn claim(&mut self, name: &str) -> bool {
        self.used.insert(name.to_ascii_lowercase())
    }

    /// Forget all allocated names.
    pub fn clear(&mut self) {
        self.used.clear();
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_identifier("My Scene (1)"), "My_Scene_1");
        assert_eq!(sanitize_identifier("__a--b__"), "a_b");
        assert_eq!(sanitize_identifier("3D Model"), "_3D_Model");
        assert_eq!(sanitize_identifier("Zürich"), "Z_rich");
        assert_eq!(sanitize_identifier("!!!"), EMPTY_NAME);
        assert_eq!(sanitize_identifier(""), EMPTY_NAME);
    }

    #[test]
    fn test_collision_appends_identifier() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("Cube", "id-1"), "Cube");
        assert_eq!(names.allocate("Cube!", "id-2"), "Cube_id_2");
        assert_eq!(names.allocate("cube", "id-3"), "cube_id_3");
    }

    #[test]
    fn test_identifier_collision_falls_back_to_counter() {
        let mut names = NameAllocator::new();
        // Identifiers that differ only in punctuation sanitize to the same token.
        assert_eq!(names.allocate("Cube", "a.b"), "Cube");
        assert_eq!(names.allocate("Cube", "a-b"), "Cube_a_b");
        assert_eq!(names.allocate("Cube", "a+b"), "Cube_a_b_2");
        assert_eq!(names.allocate("Cube", "a b"), "Cube_a_b_3");
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut names = NameAllocator::new();
        names.allocate("A", "1");
        names.clear();
        assert!(names.is_empty());
        assert_eq!(names.allocate("A", "1"), "A");
    }
}

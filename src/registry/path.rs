//! Field paths addressing a location inside an owner's serialized fields.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use crate::core::ObjectId;

/// One step of a field path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Field(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(&name.replace('~', "~0").replace('/', "~1")),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Location of a value: owner identifier plus field/index steps.
///
/// Written as `owner/field/0/sub`, escaping `~` and `/` inside field names as
/// JSON pointers do. Purely numeric steps read back as indices; consumers
/// treat an index step on a map as a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    pub owner: ObjectId,
    segments: SmallVec<[Segment; 4]>,
}

impl FieldPath {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            owner,
            segments: SmallVec::new(),
        }
    }

    /// Path extended by a field step.
    pub fn field(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Field(name.to_string()));
        next
    }

    /// Path extended by an index step.
    pub fn index(&self, i: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(i));
        next
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Top-level member the path starts in.
    pub fn member(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Field(name)) => Some(name),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('/');
        let owner = parts.next().filter(|o| !o.is_empty())?;
        let segments = parts
            .map(|p| match p.parse::<usize>() {
                Ok(i) => Segment::Index(i),
                Err(_) => Segment::Field(p.replace("~1", "/").replace("~0", "~")),
            })
            .collect();
        Some(Self {
            owner: ObjectId::new(owner),
            segments,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.owner.as_str())?;
        for seg in &self.segments {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid field path '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let p = FieldPath::new(ObjectId::new("abc")).field("lods").index(2).field("a/b");
        assert_eq!(p.to_string(), "abc/lods/2/a~1b");
        assert_eq!(FieldPath::parse("abc/lods/2/a~1b"), Some(p.clone()));
        assert_eq!(p.member(), Some("lods"));
        assert_eq!(p.segments().len(), 3);
    }

    #[test]
    fn test_serde_as_string() {
        let p = FieldPath::new(ObjectId::new("o")).field("target");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"o/target\"");
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<FieldPath>("\"\"").is_err());
    }
}

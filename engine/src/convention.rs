//! Default member pairing by name and type compatibility.

use crate::schema::{MemberPath, MemberSchema, MemberType, SchemaSet, TypeSchema};
use std::collections::HashSet;

/// How deep flattening may descend into nested source members.
const MAX_FLATTEN_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMatch {
    pub destination: String,
    pub source: MemberPath,
}

pub struct ConventionMatcher<'a> {
    schemas: &'a SchemaSet,
    flattening: bool,
}

impl<'a> ConventionMatcher<'a> {
    pub fn new(schemas: &'a SchemaSet) -> Self {
        Self {
            schemas,
            flattening: false,
        }
    }

    pub fn with_flattening(mut self, enabled: bool) -> Self {
        self.flattening = enabled;
        self
    }

    /// Pair every writable destination member not named in `explicit` with a
    /// source member. Members without a candidate are simply left out.
    pub fn match_members(
        &self,
        source: &TypeSchema,
        destination: &TypeSchema,
        explicit: &HashSet<String>,
    ) -> Vec<MemberMatch> {
        destination
            .writable_members()
            .filter(|member| !explicit.contains(&member.name))
            .filter_map(|member| {
                self.match_member(source, member).map(|path| MemberMatch {
                    destination: member.name.clone(),
                    source: path,
                })
            })
            .collect()
    }

    /// Source path for a single destination member, if convention finds one.
    pub fn match_member(&self, source: &TypeSchema, member: &MemberSchema) -> Option<MemberPath> {
        if let Some(found) = direct_match(source, &member.name, &member.member_type) {
            return Some(MemberPath::single(found.name.clone()));
        }
        if self.flattening {
            let mut segments = Vec::new();
            if self.flatten(source, &member.name, &member.member_type, &mut segments, 0) {
                return Some(MemberPath::from_segments(segments));
            }
        }
        None
    }

    /// `AddressCity` -> `Address.City`: peel a readable complex member off
    /// the front of the name and match the remainder inside its schema.
    fn flatten(
        &self,
        source: &TypeSchema,
        remaining: &str,
        target: &MemberType,
        segments: &mut Vec<String>,
        depth: usize,
    ) -> bool {
        if depth >= MAX_FLATTEN_DEPTH {
            return false;
        }

        for candidate in source.readable_members() {
            let Some(nested_type) = candidate.member_type.object_type() else {
                continue;
            };
            let Some(rest) = strip_prefix_ignore_case(remaining, &candidate.name) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let Some(nested) = self.schemas.get(nested_type) else {
                continue;
            };

            segments.push(candidate.name.clone());
            if let Some(found) = direct_match(nested, rest, target) {
                segments.push(found.name.clone());
                return true;
            }
            if self.flatten(nested, rest, target, segments, depth + 1) {
                return true;
            }
            segments.pop();
        }

        false
    }
}

fn direct_match<'s>(
    source: &'s TypeSchema,
    name: &str,
    target: &MemberType,
) -> Option<&'s MemberSchema> {
    let compatible = |m: &&MemberSchema| target.is_assignable_from(&m.member_type);
    source
        .readable_members()
        .filter(compatible)
        .find(|m| m.name == name)
        .or_else(|| {
            source
                .readable_members()
                .filter(compatible)
                .find(|m| m.name.eq_ignore_ascii_case(name))
        })
}

fn strip_prefix_ignore_case<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    if name.len() < prefix.len() || !name.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = name.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemas() -> SchemaSet {
        let mut schemas = SchemaSet::new();
        schemas.insert(
            TypeSchema::builder("Order")
                .member("Id", MemberType::Int)
                .member("customer", MemberType::object("Customer"))
                .member("Lines", MemberType::list(MemberType::object("Line")))
                .member("Total", MemberType::Float)
                .write_only("Secret", MemberType::String)
                .build(),
        );
        schemas.insert(
            TypeSchema::builder("Customer")
                .member("Name", MemberType::String)
                .member("Address", MemberType::object("Address"))
                .build(),
        );
        schemas.insert(
            TypeSchema::builder("Address")
                .member("City", MemberType::String)
                .build(),
        );
        schemas.insert(
            TypeSchema::builder("OrderDto")
                .member("ID", MemberType::Int)
                .member("Customer", MemberType::object("CustomerDto"))
                .member("Lines", MemberType::list(MemberType::object("LineDto")))
                .member("Total", MemberType::String)
                .member("Secret", MemberType::String)
                .member("CustomerName", MemberType::String)
                .member("CustomerAddressCity", MemberType::String)
                .read_only("Summary", MemberType::String)
                .build(),
        );
        schemas
    }

    fn matches(flattening: bool, explicit: &[&str]) -> Vec<MemberMatch> {
        let schemas = schemas();
        let order = schemas.get(&"Order".into()).unwrap().clone();
        let dto = schemas.get(&"OrderDto".into()).unwrap().clone();
        let explicit = explicit.iter().map(|s| s.to_string()).collect();
        ConventionMatcher::new(&schemas)
            .with_flattening(flattening)
            .match_members(&order, &dto, &explicit)
    }

    fn source_of<'m>(found: &'m [MemberMatch], destination: &str) -> Option<&'m MemberPath> {
        found
            .iter()
            .find(|m| m.destination == destination)
            .map(|m| &m.source)
    }

    #[test]
    fn test_case_insensitive_name_match() {
        let found = matches(false, &[]);
        assert_eq!(source_of(&found, "ID"), Some(&MemberPath::single("Id")));
        assert_eq!(
            source_of(&found, "Customer"),
            Some(&MemberPath::single("customer"))
        );
        assert_eq!(source_of(&found, "Lines"), Some(&MemberPath::single("Lines")));
    }

    #[test]
    fn test_incompatible_and_unreadable_members_are_skipped() {
        let found = matches(false, &[]);
        assert!(source_of(&found, "Total").is_none());
        assert!(source_of(&found, "Secret").is_none());
        assert!(source_of(&found, "Summary").is_none());
        assert!(source_of(&found, "CustomerName").is_none());
    }

    #[test]
    fn test_explicit_members_are_excluded() {
        let found = matches(false, &["ID"]);
        assert!(source_of(&found, "ID").is_none());
    }

    #[test]
    fn test_flattening() {
        let found = matches(true, &[]);
        assert_eq!(
            source_of(&found, "CustomerName"),
            Some(&MemberPath::new(&["customer", "Name"]))
        );
        assert_eq!(
            source_of(&found, "CustomerAddressCity"),
            Some(&MemberPath::new(&["customer", "Address", "City"]))
        );
    }

    #[test]
    fn test_exact_case_source_member_wins() {
        let mut schemas = SchemaSet::new();
        schemas.insert(
            TypeSchema::builder("Pair")
                .member("name", MemberType::String)
                .member("Name", MemberType::String)
                .build(),
        );
        schemas.insert(
            TypeSchema::builder("PairDto")
                .member("Name", MemberType::String)
                .member("NAME", MemberType::String)
                .build(),
        );
        let source = schemas.get(&"Pair".into()).unwrap().clone();
        let dto = schemas.get(&"PairDto".into()).unwrap().clone();

        let found = ConventionMatcher::new(&schemas).match_members(&source, &dto, &HashSet::new());

        assert_eq!(source_of(&found, "Name"), Some(&MemberPath::single("Name")));
        assert_eq!(source_of(&found, "NAME"), Some(&MemberPath::single("name")));
    }

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("CustomerName", "customer"), Some("Name"));
        assert_eq!(strip_prefix_ignore_case("Cust", "customer"), None);
    }
}

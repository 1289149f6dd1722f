//! Answer payloads carried by response frames.
//!
//! Single-response requests receive one [`Answer`] inside a
//! `Response::Answer`; streamed requests receive a sequence of
//! `Response::Part`s, each holding one batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Encoding of a concept: which kind of type or instance it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptEncoding {
    /// The root `thing` type.
    ThingType,
    /// An entity type.
    EntityType,
    /// A relation type.
    RelationType,
    /// An attribute type.
    AttributeType,
    /// A role type.
    RoleType,
    /// An entity instance.
    Entity,
    /// A relation instance.
    Relation,
    /// An attribute instance.
    Attribute,
}

impl ConceptEncoding {
    /// Returns `true` for schema-level encodings.
    #[must_use]
    pub const fn is_type(self) -> bool {
        matches!(
            self,
            Self::ThingType
                | Self::EntityType
                | Self::RelationType
                | Self::AttributeType
                | Self::RoleType
        )
    }
}

/// Value type of an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// `boolean`
    Boolean,
    /// `long`
    Long,
    /// `double`
    Double,
    /// `string`
    String,
    /// `datetime`
    Datetime,
}

/// A type or instance in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Instance identifier; absent for types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iid: Option<String>,
    /// Type label; absent for instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Concept encoding.
    pub encoding: ConceptEncoding,
    /// Value type, for attribute types and attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

impl Concept {
    /// Creates a type concept with the given label.
    #[must_use]
    pub fn new_type(label: impl Into<String>, encoding: ConceptEncoding) -> Self {
        Self {
            iid: None,
            label: Some(label.into()),
            encoding,
            value_type: None,
        }
    }

    /// Creates an instance concept with the given iid.
    #[must_use]
    pub fn new_instance(iid: impl Into<String>, encoding: ConceptEncoding) -> Self {
        Self {
            iid: Some(iid.into()),
            label: None,
            encoding,
            value_type: None,
        }
    }
}

/// One query answer: variable name to bound concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMap {
    /// Variable bindings, keyed without the leading `$`.
    pub vars: BTreeMap<String, Concept>,
}

impl ConceptMap {
    /// Returns the concept bound to `var`, with or without a leading `$`.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&Concept> {
        self.vars.get(var.trim_start_matches('$'))
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, Concept)> for ConceptMap {
    fn from_iter<I: IntoIterator<Item = (String, Concept)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Result of an aggregate query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numeric {
    /// Integer result (`count`, `sum` over longs, ...).
    Integer(i64),
    /// Floating point result (`mean`, `std`, ...).
    Double(f64),
    /// Aggregate over an empty answer set.
    #[serde(rename = "nan")]
    NaN,
}

/// An inference rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule label.
    pub label: String,
    /// Pattern the rule matches, in query syntax.
    pub when: String,
    /// Pattern the rule concludes, in query syntax.
    pub then: String,
}

/// Payload of an answer or stream part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Acknowledgement with no data.
    Unit,
    /// Zero or one concept.
    Concept {
        /// The concept, if found.
        concept: Option<Concept>,
    },
    /// A batch of concept maps.
    ConceptMaps {
        /// Answers in server order.
        maps: Vec<ConceptMap>,
    },
    /// Aggregate result.
    Numeric {
        /// The numeric value.
        value: Numeric,
    },
    /// Zero or one rule.
    Rule {
        /// The rule, if found.
        rule: Option<Rule>,
    },
    /// A batch of rules.
    Rules {
        /// Rules in server order.
        rules: Vec<Rule>,
    },
}

impl Answer {
    /// Returns the answer kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Concept { .. } => "concept",
            Self::ConceptMaps { .. } => "concept_maps",
            Self::Numeric { .. } => "numeric",
            Self::Rule { .. } => "rule",
            Self::Rules { .. } => "rules",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn concept_map_lookup_ignores_dollar() {
        let map: ConceptMap = [(
            "x".to_string(),
            Concept::new_type("person", ConceptEncoding::EntityType),
        )]
        .into_iter()
        .collect();
        assert!(map.get("$x").is_some());
        assert!(map.get("x").is_some());
        assert!(map.get("y").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn answer_is_tagged_by_kind() {
        let answer = Answer::Numeric {
            value: Numeric::Integer(7),
        };
        let json = serde_json::to_string(&answer).unwrap_or_default();
        assert_eq!(json, r#"{"kind":"numeric","value":{"integer":7}}"#);
    }

    #[test]
    fn nan_round_trips() {
        let Ok(parsed) = serde_json::from_str::<Numeric>("\"nan\"") else {
            panic!("nan should parse");
        };
        assert_eq!(parsed, Numeric::NaN);
    }

    #[test]
    fn type_encodings() {
        assert!(ConceptEncoding::AttributeType.is_type());
        assert!(!ConceptEncoding::Relation.is_type());
    }
}

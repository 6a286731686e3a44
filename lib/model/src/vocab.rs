//! Vocabularies used by the gateway.

pub use oxrdf::vocab::xsd;

/// The namespace that query templates use for predicates naming schema fields.
///
/// A predicate `<https://github.com/dbcls/grasp/ns/title>` fills the field `title`.
pub const DEFAULT_PREDICATE_NAMESPACE: &str = "https://github.com/dbcls/grasp/ns/";

/// The field that carries the identifier of an entry.
pub const IRI_FIELD: &str = "iri";

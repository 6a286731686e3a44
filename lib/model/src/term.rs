use crate::EntryValue;
use oxrdf::vocab::xsd;
use oxrdf::{LiteralRef, NamedNodeRef, SubjectRef, TermRef};

const INTEGER_DATATYPES: [NamedNodeRef<'static>; 13] = [
    xsd::INTEGER,
    xsd::INT,
    xsd::LONG,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
];

const DOUBLE_DATATYPES: [NamedNodeRef<'static>; 3] = [xsd::DOUBLE, xsd::FLOAT, xsd::DECIMAL];

/// The kind of a graph term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TermKind {
    NamedNode,
    BlankNode,
    Literal,
}

impl TermKind {
    /// Returns the kind of `term`.
    pub fn of_term(term: TermRef<'_>) -> Self {
        match term {
            TermRef::NamedNode(_) => TermKind::NamedNode,
            TermRef::BlankNode(_) => TermKind::BlankNode,
            TermRef::Literal(_) => TermKind::Literal,
        }
    }

    /// Returns the kind of `subject`.
    pub fn of_subject(subject: SubjectRef<'_>) -> Self {
        match subject {
            SubjectRef::NamedNode(_) => TermKind::NamedNode,
            SubjectRef::BlankNode(_) => TermKind::BlankNode,
        }
    }
}

/// Returns the identifier of a tuple subject.
///
/// Named nodes are identified by their IRI and blank nodes by their local id (without `_:`).
pub fn subject_id(subject: SubjectRef<'_>) -> &str {
    match subject {
        SubjectRef::NamedNode(node) => node.as_str(),
        SubjectRef::BlankNode(node) => node.as_str(),
    }
}

/// Returns the lexical value of `term`.
///
/// For nodes this is the same identifier [subject_id] produces, so an object can be used to look
/// up the tuples of a nested subject.
pub fn term_id(term: TermRef<'_>) -> &str {
    match term {
        TermRef::NamedNode(node) => node.as_str(),
        TermRef::BlankNode(node) => node.as_str(),
        TermRef::Literal(literal) => literal.value(),
    }
}

/// Converts `term` into a primitive [EntryValue].
///
/// Literals are converted according to their datatype: the integer family becomes
/// [EntryValue::Integer], `xsd:double`, `xsd:float` and `xsd:decimal` become
/// [EntryValue::Double] and `xsd:boolean` becomes [EntryValue::Boolean]. Everything else, including
/// nodes, yields its lexical value as [EntryValue::String]. A literal whose lexical form is invalid
/// for its datatype yields [EntryValue::Null].
pub fn term_to_value(term: TermRef<'_>) -> EntryValue {
    match term {
        TermRef::Literal(literal) => literal_to_value(literal),
        other => EntryValue::String(term_id(other).to_owned()),
    }
}

fn literal_to_value(literal: LiteralRef<'_>) -> EntryValue {
    let datatype = literal.datatype();
    let value = literal.value().trim();

    if INTEGER_DATATYPES.iter().any(|dt| *dt == datatype) {
        return value
            .parse::<i64>()
            .map_or(EntryValue::Null, EntryValue::Integer);
    }

    if DOUBLE_DATATYPES.iter().any(|dt| *dt == datatype) {
        return value
            .parse::<f64>()
            .map_or(EntryValue::Null, EntryValue::Double);
    }

    if datatype == xsd::BOOLEAN {
        return match value {
            "true" | "1" => EntryValue::Boolean(true),
            "false" | "0" => EntryValue::Boolean(false),
            _ => EntryValue::Null,
        };
    }

    EntryValue::String(literal.value().to_owned())
}

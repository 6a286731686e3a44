mod entry;
mod field;
mod term;
pub mod vocab;

pub use entry::*;
pub use field::*;
pub use term::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, IriParseError, Literal, LiteralRef, NamedNode, NamedNodeRef, Subject,
    SubjectRef, Term, TermRef, Triple, TripleRef,
};

/// A single graph fact as returned by a `CONSTRUCT` query.
///
/// The predicate of a [Tuple] is always a [NamedNode].
pub type Tuple = Triple;

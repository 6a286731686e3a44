use crate::error::FetchError;
use crate::source::TupleStream;
use futures::StreamExt;
use indexmap::IndexMap;
use rdf_gateway_model::{subject_id, TermKind, Tuple};

/// Tuples grouped by the identifier of their subject, in order of first appearance.
pub type TuplesBySubject = IndexMap<String, Vec<Tuple>>;

/// The result of [group_bindings].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupedBindings {
    /// All tuples, including those of blank node subjects.
    pub all: TuplesBySubject,
    /// Only the tuples of named subjects. Every key is a top-level result row.
    pub primary: TuplesBySubject,
}

impl GroupedBindings {
    /// Adds `tuple` to the groups of its subject.
    pub fn push(&mut self, tuple: Tuple) {
        let id = subject_id(tuple.subject.as_ref()).to_owned();
        if TermKind::of_subject(tuple.subject.as_ref()) != TermKind::BlankNode {
            self.primary.entry(id.clone()).or_default().push(tuple.clone());
        }
        self.all.entry(id).or_default().push(tuple);
    }
}

impl FromIterator<Tuple> for GroupedBindings {
    fn from_iter<T: IntoIterator<Item = Tuple>>(iter: T) -> Self {
        let mut grouped = Self::default();
        for tuple in iter {
            grouped.push(tuple);
        }
        grouped
    }
}

/// Consumes `stream` to completion and groups its tuples by subject.
///
/// If the stream fails, the tuples received so far are discarded.
pub async fn group_bindings(mut stream: TupleStream) -> Result<GroupedBindings, FetchError> {
    let mut grouped = GroupedBindings::default();
    while let Some(tuple) = stream.next().await {
        grouped.push(tuple.map_err(FetchError::SourceResult)?);
    }
    Ok(grouped)
}

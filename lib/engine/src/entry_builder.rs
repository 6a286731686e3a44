//! Reconstructs nested entries from tuples grouped by subject.

use crate::error::EntryBuildError;
use crate::grouping::TuplesBySubject;
use crate::resource::{Resource, ResourceIndex, ResourceShape};
use indexmap::IndexMap;
use rdf_gateway_model::vocab::IRI_FIELD;
use rdf_gateway_model::{term_id, term_to_value, Entry, EntryValue, FieldDescriptor, TermRef};

/// Builds the entry of `subject` as an instance of `shape`.
///
/// Predicates are mapped to fields by stripping the predicate namespace of `index`. Tuples whose
/// predicate does not match a declared field are ignored. Fields referring to embedded resources
/// are built recursively from the tuples of the nested subjects. The entry always carries an `iri`,
/// which falls back to `subject`.
///
/// Building is pure and only fails if an embedded value contains itself.
pub fn build_entry(
    all: &TuplesBySubject,
    subject: &str,
    shape: &ResourceShape,
    index: &ResourceIndex,
) -> Result<Entry, EntryBuildError> {
    EntryBuilder {
        all,
        index,
        path: Vec::new(),
    }
    .build(subject, shape)
}

/// Collapses the values collected for `field` according to its cardinality.
///
/// A scalar field takes the first value and is absent if there is none. A list field takes all
/// values, except for `null`s if its items are not nullable.
pub fn one_or_many(values: Vec<EntryValue>, field: &FieldDescriptor) -> Option<EntryValue> {
    if !field.is_list() {
        return values.into_iter().next();
    }
    if field.nullable_item {
        return Some(EntryValue::List(values));
    }

    let collected = values.len();
    let values = values
        .into_iter()
        .filter(|value| !value.is_null())
        .collect::<Vec<_>>();
    if values.len() < collected {
        tracing::warn!(
            field = %field.name,
            dropped = collected - values.len(),
            "Dropped null values from a list of non-nullable items"
        );
    }
    Some(EntryValue::List(values))
}

struct EntryBuilder<'a> {
    all: &'a TuplesBySubject,
    index: &'a ResourceIndex,
    /// Subjects that are currently being built, with the name of their resource.
    path: Vec<(&'a str, &'a str)>,
}

impl<'a> EntryBuilder<'a> {
    fn build(&mut self, subject: &'a str, shape: &'a ResourceShape) -> Result<Entry, EntryBuildError> {
        if self
            .path
            .iter()
            .any(|(s, r)| *s == subject && *r == shape.name)
        {
            return Err(EntryBuildError::Cycle {
                subject: subject.to_owned(),
                resource: shape.name.clone(),
            });
        }
        self.path.push((subject, shape.name.as_str()));

        let values_by_field = self.collect_values(subject, shape);
        let mut entry = Entry::new(shape.name.as_str());
        for field in &shape.fields {
            let objects = values_by_field.get(field.name.as_str());
            let values = match self.embedded_target(field) {
                Some(target) => objects
                    .into_iter()
                    .flatten()
                    .map(|object| self.build(term_id(*object), target).map(EntryValue::from))
                    .collect::<Result<Vec<_>, _>>()?,
                None => objects
                    .into_iter()
                    .flatten()
                    .map(|object| term_to_value(*object))
                    .collect(),
            };
            if let Some(value) = one_or_many(values, field) {
                entry.insert(field.name.as_str(), value);
            }
        }

        if entry.get(IRI_FIELD).map_or(true, EntryValue::is_null) {
            entry.insert(IRI_FIELD, subject);
        }

        self.path.pop();
        tracing::trace!(resource = %shape.name, subject, "Built entry");
        Ok(entry)
    }

    /// Groups the objects of `subject` by the field their predicate maps to.
    fn collect_values(
        &self,
        subject: &str,
        shape: &ResourceShape,
    ) -> IndexMap<&'a str, Vec<TermRef<'a>>> {
        let namespace = self.index.predicate_namespace();
        let mut values: IndexMap<&'a str, Vec<TermRef<'a>>> = IndexMap::new();
        for tuple in self.all.get(subject).into_iter().flatten() {
            let Some(name) = tuple.predicate.as_str().strip_prefix(namespace) else {
                continue;
            };
            if shape.field(name).is_some() {
                values.entry(name).or_default().push(tuple.object.as_ref());
            }
        }
        values
    }

    /// Returns the shape of the field's target if it is an embedded resource.
    fn embedded_target(&self, field: &FieldDescriptor) -> Option<&'a ResourceShape> {
        match self.index.lookup(&field.target)? {
            Resource::Embedded(resource) => Some(resource.shape()),
            _ => None,
        }
    }
}

use crate::vocab::IRI_FIELD;
use indexmap::IndexMap;
use std::sync::Arc;

/// Entries of a single fetch, keyed by the identifier of their subject.
pub type EntryMap = IndexMap<String, Arc<Entry>>;

/// The value of a single field of an [Entry].
#[derive(Clone, Debug, PartialEq)]
pub enum EntryValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Entry(Arc<Entry>),
    List(Vec<EntryValue>),
}

impl EntryValue {
    pub fn is_null(&self) -> bool {
        matches!(self, EntryValue::Null)
    }

    /// Returns the string if this value is a [EntryValue::String].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntryValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the nested entry if this value is an [EntryValue::Entry].
    pub fn as_entry(&self) -> Option<&Arc<Entry>> {
        match self {
            EntryValue::Entry(entry) => Some(entry),
            _ => None,
        }
    }
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        EntryValue::String(value.to_owned())
    }
}

impl From<String> for EntryValue {
    fn from(value: String) -> Self {
        EntryValue::String(value)
    }
}

impl From<i64> for EntryValue {
    fn from(value: i64) -> Self {
        EntryValue::Integer(value)
    }
}

impl From<bool> for EntryValue {
    fn from(value: bool) -> Self {
        EntryValue::Boolean(value)
    }
}

impl From<Entry> for EntryValue {
    fn from(value: Entry) -> Self {
        EntryValue::Entry(Arc::new(value))
    }
}

/// A record reconstructed from the tuples of a single subject.
///
/// An entry maps field names to values and is tagged with the name of the concrete type it was
/// built for. The tag disambiguates members of union types. Entries are plain values and hold no
/// reference to the resource that produced them.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    typename: String,
    fields: IndexMap<String, EntryValue>,
}

impl Entry {
    /// Creates an empty entry of the type `typename`.
    pub fn new(typename: impl Into<String>) -> Self {
        Self {
            typename: typename.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style variant of [Self::insert].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<EntryValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the name of the type this entry was built for.
    pub fn typename(&self) -> &str {
        &self.typename
    }

    /// Returns the identifier of this entry, if it has one.
    pub fn iri(&self) -> Option<&str> {
        self.fields.get(IRI_FIELD).and_then(EntryValue::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&EntryValue> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<EntryValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &EntryValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The declared type of a schema field.
///
/// This mirrors the wrapping structure of a GraphQL type reference, e.g. `[String!]!` is a non-null
/// list of non-null `String`s.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Named { name: String, nullable: bool },
    List { item: Box<FieldType>, nullable: bool },
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        FieldType::Named {
            name: name.into(),
            nullable: true,
        }
    }

    pub fn list(item: FieldType) -> Self {
        FieldType::List {
            item: Box::new(item),
            nullable: true,
        }
    }

    /// Returns a non-null variant of this type.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            FieldType::Named { name, .. } => FieldType::Named {
                name,
                nullable: false,
            },
            FieldType::List { item, .. } => FieldType::List {
                item,
                nullable: false,
            },
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            FieldType::Named { nullable, .. } | FieldType::List { nullable, .. } => *nullable,
        }
    }

    /// Returns whether the outermost type (ignoring non-null wrappers) is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List { .. })
    }

    /// Returns the name of the innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            FieldType::Named { name, .. } => name,
            FieldType::List { item, .. } => item.named_type(),
        }
    }
}

/// Whether a field holds a single value or a list of values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Scalar,
    List,
}

/// A field of a resource, derived once from its declared [FieldType].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// The name of the field.
    pub name: String,
    /// The name of the type the field refers to.
    pub target: String,
    pub cardinality: Cardinality,
    /// Whether the items of a list field may be null. Always `true` for scalar fields.
    pub nullable_item: bool,
}

impl FieldDescriptor {
    /// Derives the descriptor of the field `name` declared with the type `ty`.
    pub fn new(name: impl Into<String>, ty: &FieldType) -> Self {
        let (cardinality, nullable_item) = match ty {
            FieldType::Named { .. } => (Cardinality::Scalar, true),
            FieldType::List { item, .. } => (Cardinality::List, item.is_nullable()),
        };
        Self {
            name: name.into(),
            target: ty.named_type().to_owned(),
            cardinality,
            nullable_item,
        }
    }

    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::List
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_null_list_is_list() {
        let ty = FieldType::list(FieldType::named("String")).non_null();
        assert!(ty.is_list());
        assert!(!ty.is_nullable());
    }

    #[test]
    fn nested_list_unwraps_to_named_type() {
        let ty = FieldType::list(FieldType::list(FieldType::named("Book").non_null())).non_null();
        assert_eq!(ty.named_type(), "Book");
    }

    #[test]
    fn descriptor_of_non_null_items() {
        let ty = FieldType::list(FieldType::named("String").non_null());
        let descriptor = FieldDescriptor::new("names", &ty);
        assert_eq!(descriptor.cardinality, Cardinality::List);
        assert_eq!(descriptor.target, "String");
        assert!(!descriptor.nullable_item);
    }

    #[test]
    fn descriptor_of_scalar() {
        let descriptor = FieldDescriptor::new("id", &FieldType::named("ID").non_null());
        assert_eq!(descriptor.cardinality, Cardinality::Scalar);
        assert!(descriptor.nullable_item);
    }
}

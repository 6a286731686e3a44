//! Builds the executable GraphQL schema from the engine's schema definition.

use crate::error::field_error;
use async_graphql::dynamic::{
    Enum, Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Scalar, Schema,
    SchemaError, TypeRef, Union,
};
use async_graphql::{Name, Number, Value};
use rdf_gateway_engine::schema::{FieldDefinition, ObjectDefinition, SchemaDefinition};
use rdf_gateway_engine::{Engine, RequestContext, Resolved};
use rdf_gateway_model::{Entry, EntryValue, FieldType};
use std::sync::Arc;

/// Creates a schema whose fields are resolved by `engine`.
///
/// Every request executed against the schema must carry a [RequestContext].
pub fn build_schema(engine: Arc<Engine>) -> Result<Schema, SchemaError> {
    let definition = engine.schema();
    let mut builder = Schema::build(definition.query.name.as_str(), None, None)
        .register(object(definition, &definition.query));

    for object_definition in &definition.objects {
        builder = builder.register(object(definition, object_definition));
    }
    for union in &definition.unions {
        builder = builder.register(
            union
                .members
                .iter()
                .fold(Union::new(union.name.as_str()), |graphql_union, member| {
                    graphql_union.possible_type(member.as_str())
                }),
        );
    }
    for enumeration in &definition.enums {
        builder = builder.register(
            enumeration
                .values
                .iter()
                .fold(Enum::new(enumeration.name.as_str()), |graphql_enum, value| {
                    graphql_enum.item(value.as_str())
                }),
        );
    }
    for scalar in &definition.scalars {
        builder = builder.register(Scalar::new(scalar.as_str()));
    }

    builder.data(engine).finish()
}

fn object(schema: &SchemaDefinition, definition: &ObjectDefinition) -> Object {
    let mut object = Object::new(definition.name.as_str());
    if let Some(description) = &definition.description {
        object = object.description(description.as_str());
    }
    let is_query = definition.name == schema.query.name;
    for field_definition in &definition.fields {
        let output = Output::of(schema, field_definition.ty.named_type());
        object = object.field(field(&definition.name, field_definition, is_query, output));
    }
    object
}

/// How resolved values of a field are handed to the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Plain,
    Enum,
    /// Entries must name their concrete type.
    Union,
}

impl Output {
    fn of(schema: &SchemaDefinition, target: &str) -> Self {
        if schema.enums.iter().any(|e| e.name == target) {
            Output::Enum
        } else if schema.unions.iter().any(|u| u.name == target) {
            Output::Union
        } else {
            Output::Plain
        }
    }
}

fn field(type_name: &str, definition: &FieldDefinition, is_query: bool, output: Output) -> Field {
    let type_name = Arc::<str>::from(type_name);
    let field_name = Arc::<str>::from(definition.name.as_str());

    let mut field = Field::new(
        definition.name.as_str(),
        type_ref(&definition.ty),
        move |ctx| {
            let type_name = Arc::clone(&type_name);
            let field_name = Arc::clone(&field_name);
            FieldFuture::new(async move {
                let engine = ctx.data::<Arc<Engine>>()?;
                let request = ctx.data::<RequestContext>()?;
                let parent = if is_query {
                    None
                } else {
                    Some(&**ctx.parent_value.try_downcast_ref::<Arc<Entry>>()?)
                };
                let args = arguments(&ctx)?;

                let resolved = engine
                    .resolve(
                        &type_name,
                        &field_name,
                        parent,
                        &args,
                        request,
                    )
                    .await
                    .map_err(|e| field_error(&e))?;
                Ok(field_value(resolved, output))
            })
        },
    );
    if let Some(description) = &definition.description {
        field = field.description(description.as_str());
    }
    for argument in &definition.arguments {
        field = field.argument(InputValue::new(
            argument.name.as_str(),
            type_ref(&argument.ty),
        ));
    }
    field
}

fn type_ref(ty: &FieldType) -> TypeRef {
    let (inner, nullable) = match ty {
        FieldType::Named { name, nullable } => (TypeRef::Named(name.clone().into()), *nullable),
        FieldType::List { item, nullable } => (TypeRef::List(Box::new(type_ref(item))), *nullable),
    };
    if nullable {
        inner
    } else {
        TypeRef::NonNull(Box::new(inner))
    }
}

/// Collects the arguments of a field into a JSON object for rendering query templates.
fn arguments(ctx: &ResolverContext<'_>) -> Result<serde_json::Value, async_graphql::Error> {
    let mut args = serde_json::Map::new();
    for (name, value) in ctx.args.iter() {
        args.insert(name.to_string(), value.as_value().clone().into_json()?);
    }
    Ok(serde_json::Value::Object(args))
}

fn field_value(resolved: Resolved, output: Output) -> Option<FieldValue<'static>> {
    match resolved {
        Resolved::Null => None,
        Resolved::Value(value) if output == Output::Enum => {
            Some(FieldValue::value(enum_value(graphql_value(value))))
        }
        Resolved::Value(value) => Some(FieldValue::value(graphql_value(value))),
        Resolved::Entry(entry) if output == Output::Union => {
            let typename = entry.typename().to_owned();
            Some(FieldValue::owned_any(entry).with_type(typename))
        }
        Resolved::Entry(entry) => Some(FieldValue::owned_any(entry)),
        Resolved::List(items) => Some(FieldValue::list(
            items
                .into_iter()
                .map(|item| field_value(item, output).unwrap_or(FieldValue::NULL)),
        )),
    }
}

fn graphql_value(value: EntryValue) -> Value {
    match value {
        EntryValue::Null | EntryValue::Entry(_) => Value::Null,
        EntryValue::Boolean(value) => Value::Boolean(value),
        EntryValue::Integer(value) => Value::Number(Number::from(value)),
        EntryValue::Double(value) => Number::from_f64(value).map_or(Value::Null, Value::Number),
        EntryValue::String(value) => Value::String(value),
        EntryValue::List(values) => Value::List(values.into_iter().map(graphql_value).collect()),
    }
}

/// Enum values arrive as plain strings from the source.
fn enum_value(value: Value) -> Value {
    match value {
        Value::String(name) => Value::Enum(Name::new(name)),
        Value::List(values) => Value::List(values.into_iter().map(enum_value).collect()),
        other => other,
    }
}

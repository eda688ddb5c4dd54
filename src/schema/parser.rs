//! Schema parser
//!
//! Uses nom to parse schema definition text into a [`SchemaDocument`].

use super::{
    Directive, FieldDefinition, InputValueDefinition, SchemaDocument, TypeDefinition, TypeKind,
    TypeRef, Value,
};
use crate::error::{TransformError, TransformResult};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, none_of, not_line_ending, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, many0_count, many1, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// Parse schema text into a document.
pub fn parse_schema(input: &str) -> TransformResult<SchemaDocument> {
    match document(input) {
        Ok((rest, definitions)) if rest.is_empty() => Ok(SchemaDocument { definitions }),
        Ok((rest, _)) => Err(TransformError::SchemaParse(format!(
            "unexpected input at line {}: {}",
            line_of(input, rest),
            snippet(rest)
        ))),
        Err(e) => Err(TransformError::SchemaParse(format!("{:?}", e))),
    }
}

fn line_of(input: &str, rest: &str) -> usize {
    let consumed = input.len() - rest.len();
    input[..consumed].matches('\n').count() + 1
}

fn snippet(rest: &str) -> &str {
    let end = rest
        .char_indices()
        .nth(40)
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    rest[..end].lines().next().unwrap_or("")
}

// ============================================================================
// Lexical
// ============================================================================

/// Whitespace, commas and `#` comments.
fn ignored(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            recognize(pair(char('#'), not_line_ending)),
            tag(","),
        ))),
    )(input)
}

fn sp<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(ignored, inner)
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn string_value(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                none_of("\\\"\n"),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("/", tag("/")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            char('"'),
        ),
        |s: Option<String>| s.unwrap_or_default(),
    )(input)
}

fn block_string(input: &str) -> IResult<&str, String> {
    map(
        delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\"")),
        |s: &str| s.trim().to_string(),
    )(input)
}

fn description(input: &str) -> IResult<&str, String> {
    alt((block_string, string_value))(input)
}

// ============================================================================
// Values and directives
// ============================================================================

fn number(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| {
            if s.contains(|c| matches!(c, '.' | 'e' | 'E')) {
                s.parse::<f64>().map(Value::Float).map_err(|e| e.to_string())
            } else {
                s.parse::<i64>().map(Value::Int).map_err(|e| e.to_string())
            }
        },
    )(input)
}

fn object_field(input: &str) -> IResult<&str, (String, Value)> {
    map(
        tuple((sp(name), sp(char(':')), sp(parse_value))),
        |(key, _, v)| (key.to_string(), v),
    )(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        number,
        map(block_string, Value::String),
        map(string_value, Value::String),
        map(
            delimited(char('['), many0(sp(parse_value)), sp(char(']'))),
            Value::List,
        ),
        map(
            delimited(char('{'), many0(object_field), sp(char('}'))),
            Value::Object,
        ),
        map(name, |word: &str| match word {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            "null" => Value::Null,
            other => Value::Enum(other.to_string()),
        }),
    ))(input)
}

fn directive(input: &str) -> IResult<&str, Directive> {
    let (input, _) = char('@')(input)?;
    let (input, directive_name) = name(input)?;
    let (input, arguments) = opt(delimited(
        sp(char('(')),
        many0(object_field),
        sp(char(')')),
    ))(input)?;
    Ok((
        input,
        Directive {
            name: directive_name.to_string(),
            arguments: arguments.unwrap_or_default(),
        },
    ))
}

fn directive_list(input: &str) -> IResult<&str, Vec<Directive>> {
    many0(sp(directive))(input)
}

// ============================================================================
// Types and fields
// ============================================================================

fn type_ref(input: &str) -> IResult<&str, TypeRef> {
    let (input, base) = alt((
        map(name, |n: &str| TypeRef::Named(n.to_string())),
        map(
            delimited(char('['), sp(type_ref), sp(char(']'))),
            |inner| TypeRef::List(Box::new(inner)),
        ),
    ))(input)?;
    let (input, bang) = opt(sp(char('!')))(input)?;
    let ty = match bang {
        Some(_) => TypeRef::NonNull(Box::new(base)),
        None => base,
    };
    Ok((input, ty))
}

fn input_value(input: &str) -> IResult<&str, InputValueDefinition> {
    let (input, _) = opt(sp(description))(input)?;
    let (input, arg_name) = sp(name)(input)?;
    let (input, _) = sp(char(':'))(input)?;
    let (input, ty) = sp(type_ref)(input)?;
    let (input, default_value) = opt(preceded(sp(char('=')), sp(parse_value)))(input)?;
    let (input, _) = directive_list(input)?;
    Ok((
        input,
        InputValueDefinition {
            name: arg_name.to_string(),
            ty,
            default_value,
        },
    ))
}

fn argument_definitions(input: &str) -> IResult<&str, Vec<InputValueDefinition>> {
    delimited(sp(char('(')), many0(input_value), sp(char(')')))(input)
}

fn field_definition(input: &str) -> IResult<&str, FieldDefinition> {
    let (input, _) = opt(sp(description))(input)?;
    let (input, field_name) = sp(name)(input)?;
    let (input, arguments) = opt(argument_definitions)(input)?;
    let (input, _) = sp(char(':'))(input)?;
    let (input, ty) = sp(type_ref)(input)?;
    // Input object defaults are accepted and dropped.
    let (input, _) = opt(preceded(sp(char('=')), sp(parse_value)))(input)?;
    let (input, directives) = directive_list(input)?;
    Ok((
        input,
        FieldDefinition {
            name: field_name.to_string(),
            arguments: arguments.unwrap_or_default(),
            ty,
            directives,
        },
    ))
}

fn empty_type(kind: TypeKind, type_name: &str, extends: bool) -> TypeDefinition {
    TypeDefinition {
        kind,
        name: type_name.to_string(),
        extends,
        implements: Vec::new(),
        directives: Vec::new(),
        fields: Vec::new(),
        members: Vec::new(),
    }
}

fn object_like(input: &str, kind: TypeKind, extends: bool) -> IResult<&str, Option<TypeDefinition>> {
    let (input, type_name) = sp(name)(input)?;
    let (input, implements) = opt(preceded(
        sp(tag("implements")),
        many1(preceded(opt(sp(char('&'))), sp(name))),
    ))(input)?;
    let (input, directives) = directive_list(input)?;
    let (input, fields) = opt(delimited(
        sp(char('{')),
        many0(field_definition),
        sp(char('}')),
    ))(input)?;

    let mut definition = empty_type(kind, type_name, extends);
    definition.implements = implements
        .unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect();
    definition.directives = directives;
    definition.fields = fields.unwrap_or_default();
    Ok((input, Some(definition)))
}

fn enum_definition(input: &str, extends: bool) -> IResult<&str, Option<TypeDefinition>> {
    let (input, type_name) = sp(name)(input)?;
    let (input, directives) = directive_list(input)?;
    let (input, members) = opt(delimited(
        sp(char('{')),
        many0(map(
            tuple((opt(sp(description)), sp(name), directive_list)),
            |(_, member, _)| member.to_string(),
        )),
        sp(char('}')),
    ))(input)?;

    let mut definition = empty_type(TypeKind::Enum, type_name, extends);
    definition.directives = directives;
    definition.members = members.unwrap_or_default();
    Ok((input, Some(definition)))
}

fn union_definition(input: &str, extends: bool) -> IResult<&str, Option<TypeDefinition>> {
    let (input, type_name) = sp(name)(input)?;
    let (input, directives) = directive_list(input)?;
    let (input, members) = opt(preceded(
        sp(char('=')),
        preceded(
            opt(sp(char('|'))),
            separated_list1(sp(char('|')), sp(name)),
        ),
    ))(input)?;

    let mut definition = empty_type(TypeKind::Union, type_name, extends);
    definition.directives = directives;
    definition.members = members
        .unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok((input, Some(definition)))
}

fn scalar_definition(input: &str, extends: bool) -> IResult<&str, Option<TypeDefinition>> {
    let (input, type_name) = sp(name)(input)?;
    let (input, directives) = directive_list(input)?;
    let mut definition = empty_type(TypeKind::Scalar, type_name, extends);
    definition.directives = directives;
    Ok((input, Some(definition)))
}

/// `schema { query: Query }` carries nothing the passes use.
fn schema_block(input: &str) -> IResult<&str, Option<TypeDefinition>> {
    let (input, _) = directive_list(input)?;
    let (input, _) = delimited(
        sp(char('{')),
        many0(tuple((sp(name), sp(char(':')), sp(name)))),
        sp(char('}')),
    )(input)?;
    Ok((input, None))
}

fn directive_definition(input: &str) -> IResult<&str, Option<TypeDefinition>> {
    let (input, _) = sp(char('@'))(input)?;
    let (input, _) = name(input)?;
    let (input, _) = opt(argument_definitions)(input)?;
    let (input, _) = opt(sp(tag("repeatable")))(input)?;
    let (input, _) = sp(tag("on"))(input)?;
    let (input, _) = preceded(
        opt(sp(char('|'))),
        separated_list1(sp(char('|')), sp(is_not(" \t\r\n|#,"))),
    )(input)?;
    Ok((input, None))
}

fn type_definition(input: &str) -> IResult<&str, Option<TypeDefinition>> {
    let (input, _) = opt(sp(description))(input)?;
    let (mut input, mut keyword) = sp(name)(input)?;
    let mut extends = false;
    if keyword == "extend" {
        let (rest, next) = sp(name)(input)?;
        input = rest;
        keyword = next;
        extends = true;
    }

    match keyword {
        "type" => object_like(input, TypeKind::Object, extends),
        "input" => object_like(input, TypeKind::Input, extends),
        "interface" => object_like(input, TypeKind::Interface, extends),
        "enum" => enum_definition(input, extends),
        "union" => union_definition(input, extends),
        "scalar" => scalar_definition(input, extends),
        "schema" => schema_block(input),
        "directive" => directive_definition(input),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

fn document(input: &str) -> IResult<&str, Vec<TypeDefinition>> {
    let (input, definitions) = many0(type_definition)(input)?;
    let (input, _) = ignored(input)?;
    Ok((input, definitions.into_iter().flatten().collect()))
}

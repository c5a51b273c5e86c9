//! Ingestion of the nested group markup served by the platform.
//!
//! The platform delivers its group hierarchy as a base64 encoded document of
//! nested `<group>` elements. [`ingest`] streams that document once through
//! a `quick_xml` reader and tracks the innermost open group with an explicit
//! cursor, so nesting depth never grows the call stack.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::smartschool::api::error::{ApiError, Result};
use crate::smartschool::api::model::{Group, GroupId, GroupKind, GroupTree};

const GROUP_TAG: &[u8] = b"group";

/// Decodes the base64 payload returned by the platform into markup text.
pub fn decode_payload(encoded: &str) -> Result<String> {
    let compact: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| ApiError::Payload(format!("base64: {err}")))?;
    String::from_utf8(bytes).map_err(|err| ApiError::Payload(format!("utf-8: {err}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    Kind,
    Code,
    Untis,
    Visible,
    Official,
    CoAccountLabel,
    AdminNumber,
    InstituteNumber,
    Titular,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        Some(match tag {
            b"name" => Field::Name,
            b"desc" => Field::Description,
            b"type" => Field::Kind,
            b"code" => Field::Code,
            b"untis" => Field::Untis,
            b"visible" => Field::Visible,
            b"isOfficial" => Field::Official,
            b"coAccountLabel" => Field::CoAccountLabel,
            b"adminNumber" => Field::AdminNumber,
            b"instituteNumber" => Field::InstituteNumber,
            b"username" => Field::Titular,
            _ => return None,
        })
    }

    fn tag(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Description => "desc",
            Field::Kind => "type",
            Field::Code => "code",
            Field::Untis => "untis",
            Field::Visible => "visible",
            Field::Official => "isOfficial",
            Field::CoAccountLabel => "coAccountLabel",
            Field::AdminNumber => "adminNumber",
            Field::InstituteNumber => "instituteNumber",
            Field::Titular => "username",
        }
    }
}

/// A field value that could not be converted. The field keeps its previous
/// value and ingestion carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiagnostic {
    pub group: GroupId,
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for FieldDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {}: {} '{}' ignored ({})",
            self.group, self.field, self.value, self.reason
        )
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// Tree rooted at a synthetic wrapper whose children are the top-level
    /// groups, in document order.
    pub tree: GroupTree,
    pub diagnostics: Vec<FieldDiagnostic>,
}

/// Builds a group tree from markup text.
///
/// Every `<group>` element becomes a node below the group that encloses it.
/// Field elements assign to the innermost open group. Only unbalanced or
/// otherwise malformed markup fails; bad field values are reported through
/// [`Ingested::diagnostics`].
pub fn ingest(markup: &str) -> Result<Ingested> {
    let mut tree = GroupTree::new();
    let mut diagnostics = Vec::new();
    let mut cursor = tree.root();
    // Field waiting for its text, and whether the text already arrived.
    let mut pending: Option<(Field, bool)> = None;
    let mut open = 0usize;

    let mut reader = Reader::from_str(markup);
    loop {
        let event = reader
            .read_event()
            .map_err(|err| markup_error(reader.error_position(), err))?;
        match event {
            Event::Start(start) => {
                open += 1;
                if start.name().as_ref() == GROUP_TAG {
                    cursor = tree.add_child(cursor, Group::default());
                    pending = None;
                } else {
                    pending = Field::from_tag(start.name().as_ref()).map(|field| (field, false));
                }
            }
            Event::Empty(empty) => {
                if empty.name().as_ref() == GROUP_TAG {
                    tree.add_child(cursor, Group::default());
                } else if let Some(field) = Field::from_tag(empty.name().as_ref()) {
                    assign(&mut tree, cursor, field, "", &mut diagnostics);
                }
                pending = None;
            }
            Event::Text(text) => {
                if let Some((field, false)) = pending {
                    let value = text
                        .unescape()
                        .map_err(|err| markup_error(reader.buffer_position(), err))?;
                    assign(&mut tree, cursor, field, &value, &mut diagnostics);
                    pending = Some((field, true));
                }
            }
            Event::CData(cdata) => {
                if let Some((field, false)) = pending {
                    let raw = cdata.into_inner();
                    let value = std::str::from_utf8(&raw)
                        .map_err(|err| markup_error(reader.buffer_position(), err))?;
                    assign(&mut tree, cursor, field, value, &mut diagnostics);
                    pending = Some((field, true));
                }
            }
            Event::End(end) => {
                open = open.saturating_sub(1);
                if end.name().as_ref() == GROUP_TAG {
                    cursor = tree.parent(cursor).ok_or_else(|| {
                        markup_error(reader.buffer_position(), "group closed without a parent")
                    })?;
                    pending = None;
                } else if let Some((field, false)) = pending.take() {
                    if field.tag().as_bytes() == end.name().as_ref() {
                        assign(&mut tree, cursor, field, "", &mut diagnostics);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if open > 0 {
        return Err(markup_error(
            reader.buffer_position(),
            format!("{open} element(s) never closed"),
        ));
    }

    Ok(Ingested { tree, diagnostics })
}

/// Decodes a base64 payload and ingests the markup it carries.
pub fn ingest_payload(encoded: &str) -> Result<Ingested> {
    let markup = decode_payload(encoded)?;
    ingest(&markup)
}

fn markup_error(position: impl TryInto<usize>, reason: impl fmt::Display) -> ApiError {
    ApiError::Markup {
        offset: position.try_into().unwrap_or(usize::MAX),
        reason: reason.to_string(),
    }
}

fn assign(
    tree: &mut GroupTree,
    id: GroupId,
    field: Field,
    value: &str,
    diagnostics: &mut Vec<FieldDiagnostic>,
) {
    let group = tree.group_mut(id);
    match field {
        Field::Name => group.name = value.to_string(),
        Field::Description => group.description = value.to_string(),
        Field::Kind => group.kind = GroupKind::from_markup(value),
        Field::Code => group.code = value.to_string(),
        Field::Untis => group.untis = value.to_string(),
        Field::Visible => group.visible = value == "1",
        Field::Official => group.official = value == "1",
        Field::CoAccountLabel => group.co_account_label = value.to_string(),
        Field::InstituteNumber => group.institute_number = value.to_string(),
        Field::Titular => group.titulars.push(value.to_string()),
        Field::AdminNumber => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return;
            }
            match trimmed.parse::<i32>() {
                Ok(number) => group.admin_number = number,
                Err(err) => {
                    tracing::warn!(
                        group = %id,
                        value = trimmed,
                        "admin number is not numeric, keeping previous value"
                    );
                    diagnostics.push(FieldDiagnostic {
                        group: id,
                        field: field.tag(),
                        value: value.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}

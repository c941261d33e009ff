//! `.dbf` attribute table parser (dBASE III layout used by shapefiles).

use serde_json::{Number, Value};

use crate::error::ShapefileError;
use crate::format::geojson::Properties;
use crate::io::{read_u16_le, read_u32_le};

/// Size of the fixed table header.
pub const DBF_HEADER_SIZE: usize = 32;

/// Size of one field descriptor.
const FIELD_DESCRIPTOR_SIZE: usize = 32;

/// Marks the end of the field descriptor array.
const FIELD_TERMINATOR: u8 = 0x0D;

// =============================================================================
// TextEncoding
// =============================================================================

/// Character encoding for text fields, taken from the dataset's `.cpg` file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,

    /// ISO-8859-1; also used for Windows-1252 code pages
    Latin1,
}

impl TextEncoding {
    /// Map a `.cpg` code page declaration to an encoding.
    ///
    /// Returns None for code pages that are not recognized.
    pub fn from_cpg(cpg: &str) -> Option<Self> {
        let normalized: String = cpg
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "utf8" | "65001" => Some(TextEncoding::Utf8),
            "iso88591" | "88591" | "latin1" | "1252" | "cp1252" | "windows1252" | "ansi1252" => {
                Some(TextEncoding::Latin1)
            }
            _ => None,
        }
    }

    /// Decode raw field bytes.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

// =============================================================================
// Field descriptors
// =============================================================================

/// One column of the attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfField {
    /// Column name (property key)
    pub name: String,

    /// dBASE type code: C, N, F, L, D, ...
    pub kind: u8,

    /// Width in bytes
    pub length: usize,

    /// Decimal places for numeric fields
    pub decimals: u8,
}

/// Parsed table header.
#[derive(Debug, Clone, PartialEq)]
pub struct DbfHeader {
    pub record_count: usize,
    pub header_length: usize,
    pub record_length: usize,
    pub fields: Vec<DbfField>,
}

impl DbfHeader {
    /// Parse the table header and field descriptors.
    pub fn parse(bytes: &[u8], encoding: TextEncoding) -> Result<Self, ShapefileError> {
        if bytes.len() < DBF_HEADER_SIZE {
            return Err(ShapefileError::FileTooSmall {
                required: DBF_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let record_count = read_u32_le(&bytes[4..8]) as usize;
        let header_length = read_u16_le(&bytes[8..10]) as usize;
        let record_length = read_u16_le(&bytes[10..12]) as usize;

        let descriptors_end = header_length.min(bytes.len());
        let mut fields = Vec::new();
        let mut pos = DBF_HEADER_SIZE;

        while pos < descriptors_end && bytes[pos] != FIELD_TERMINATOR {
            if pos + FIELD_DESCRIPTOR_SIZE > bytes.len() {
                return Err(ShapefileError::InvalidTable(format!(
                    "field descriptor at offset {} is truncated",
                    pos
                )));
            }
            let descriptor = &bytes[pos..pos + FIELD_DESCRIPTOR_SIZE];

            let name_bytes = &descriptor[..11];
            let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(11);
            let name = encoding.decode(&name_bytes[..name_len]).trim().to_string();

            fields.push(DbfField {
                name,
                kind: descriptor[11].to_ascii_uppercase(),
                length: descriptor[16] as usize,
                decimals: descriptor[17],
            });
            pos += FIELD_DESCRIPTOR_SIZE;
        }

        let fields_width: usize = fields.iter().map(|f| f.length).sum();
        if record_count > 0 && fields_width + 1 > record_length {
            return Err(ShapefileError::InvalidTable(format!(
                "record length {} cannot hold fields totalling {} bytes",
                record_length, fields_width
            )));
        }

        Ok(Self {
            record_count,
            header_length,
            record_length,
            fields,
        })
    }
}

// =============================================================================
// Records
// =============================================================================

/// Read every row of a `.dbf` file as feature properties.
///
/// Rows are returned in file order. Deleted-record flags are ignored so that
/// row `i` always belongs to shape `i`. A table that ends early yields the
/// rows that are complete.
pub fn read_table(bytes: &[u8], encoding: TextEncoding) -> Result<Vec<Properties>, ShapefileError> {
    let header = DbfHeader::parse(bytes, encoding)?;
    let mut rows = Vec::with_capacity(header.record_count.min(bytes.len()));

    for index in 0..header.record_count {
        let start = header.header_length + index * header.record_length;
        let Some(record) = bytes.get(start..start + header.record_length) else {
            break;
        };

        // Skip the deletion flag
        let mut offset = 1;
        let mut properties = Properties::new();
        for field in &header.fields {
            let raw = &record[offset..offset + field.length];
            properties.insert(field.name.clone(), decode_value(field, raw, encoding));
            offset += field.length;
        }
        rows.push(properties);
    }

    Ok(rows)
}

/// Convert one raw field value to JSON.
fn decode_value(field: &DbfField, raw: &[u8], encoding: TextEncoding) -> Value {
    let text = encoding.decode(raw);
    let trimmed = text.trim_matches(|c: char| c == ' ' || c == '\0');

    match field.kind {
        b'C' => Value::String(trimmed.to_string()),
        b'N' | b'F' => decode_number(trimmed, field.decimals),
        b'L' => match trimmed.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => Value::Bool(true),
            Some('F' | 'f' | 'N' | 'n') => Value::Bool(false),
            _ => Value::Null,
        },
        b'D' => {
            if trimmed.is_empty() {
                Value::Null
            } else if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                Value::String(format!(
                    "{}-{}-{}",
                    &trimmed[0..4],
                    &trimmed[4..6],
                    &trimmed[6..8]
                ))
            } else {
                Value::String(trimmed.to_string())
            }
        }
        _ => Value::String(trimmed.to_string()),
    }
}

fn decode_number(text: &str, decimals: u8) -> Value {
    if text.is_empty() || text.chars().all(|c| c == '*') {
        return Value::Null;
    }

    if decimals == 0 {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(n.into());
        }
    }

    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// =============================================================================
// Tests
// =============================================================================

//! dBASE III attribute tables (`.dbf`), the attribute half of a shapefile.
//!
//! Values are decoded into `serde_json` values so they can be dropped
//! straight into GeoJSON feature properties.

use serde_json::{Map, Number, Value};

use crate::{GeometryError, GeometryResult};

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const DESCRIPTOR_END: u8 = 0x0D;
const DELETED: u8 = b'*';

/// One column of a dBASE table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbfField {
    pub name: String,
    /// dBASE type code: `C`, `N`, `F`, `L`, `D`, ...
    pub kind: u8,
    pub length: usize,
    pub decimals: u8,
}

/// A decoded table.  `records[i]` is `None` when row `i` is flagged
/// deleted; indices stay aligned with the shapes of the `.shp`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DbfTable {
    pub fields: Vec<DbfField>,
    pub records: Vec<Option<Map<String, Value>>>,
}

impl DbfTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse a complete `.dbf` file held in memory.
pub fn read_dbf(bytes: &[u8]) -> GeometryResult<DbfTable> {
    if bytes.len() < HEADER_LEN {
        return Err(GeometryError::Dbf("file shorter than the 32-byte header".into()));
    }
    let num_records = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let record_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;

    let fields = read_fields(bytes, header_len)?;
    let declared: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
    if declared != record_len {
        return Err(GeometryError::Dbf(format!(
            "record length {record_len} does not match field widths ({declared})"
        )));
    }

    let mut records = Vec::with_capacity(num_records);
    for i in 0..num_records {
        let start = header_len + i * record_len;
        let row = bytes
            .get(start..start + record_len)
            .ok_or_else(|| GeometryError::Dbf(format!("record {i} runs past end of file")))?;
        if row[0] == DELETED {
            records.push(None);
            continue;
        }
        let mut values = Map::new();
        let mut at = 1;
        for field in &fields {
            let raw = &row[at..at + field.length];
            values.insert(field.name.clone(), decode_value(field, raw));
            at += field.length;
        }
        records.push(Some(values));
    }

    Ok(DbfTable { fields, records })
}

fn read_fields(bytes: &[u8], header_len: usize) -> GeometryResult<Vec<DbfField>> {
    let mut fields = Vec::new();
    let mut at = HEADER_LEN;
    loop {
        match bytes.get(at) {
            Some(&DESCRIPTOR_END) => break,
            Some(_) => {}
            None => return Err(GeometryError::Dbf("unterminated field descriptors".into())),
        }
        if at + DESCRIPTOR_LEN > header_len {
            return Err(GeometryError::Dbf("field descriptors overrun header".into()));
        }
        let d = bytes
            .get(at..at + DESCRIPTOR_LEN)
            .ok_or_else(|| GeometryError::Dbf("truncated field descriptor".into()))?;
        let name_end = d[..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(DbfField {
            name: String::from_utf8_lossy(&d[..name_end]).trim().to_owned(),
            kind: d[11],
            length: d[16] as usize,
            decimals: d[17],
        });
        at += DESCRIPTOR_LEN;
    }
    Ok(fields)
}

fn decode_value(field: &DbfField, raw: &[u8]) -> Value {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    match field.kind {
        b'N' | b'F' => {
            if text.is_empty() || text.starts_with('*') {
                return Value::Null;
            }
            if field.decimals == 0 {
                if let Ok(i) = text.parse::<i64>() {
                    return Value::Number(i.into());
                }
            }
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number)
        }
        b'L' => match text.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => Value::Bool(true),
            Some('F' | 'f' | 'N' | 'n') => Value::Bool(false),
            _ => Value::Null,
        },
        _ if text.is_empty() => Value::Null,
        _ => Value::String(text.to_owned()),
    }
}

//! Decoder for keyed-archive (binary property list) attributed strings.
//!
//! A keyed archive is a plist dictionary whose `$objects` array holds every
//! archived object and whose `$top.root` is a UID into that array. The
//! attributed string's root object points at its backing string through an
//! `NSString` key; a bare string object stores its characters under
//! `NS.string`.

use crate::error::{Error, Result};
use plist::Value;
use std::io::Cursor;

const BINARY_PLIST_MAGIC: &[u8] = b"bplist";
const STRING_KEYS: [&str; 2] = ["NSString", "NS.string"];
const MAX_DEPTH: usize = 8;

fn decode_err(message: impl Into<String>) -> Error {
    Error::RowDecode(format!("keyed archive: {}", message.into()))
}

/// Extract the plain string from a keyed-archived attributed string.
pub fn decode(data: &[u8]) -> Result<String> {
    if !data.starts_with(BINARY_PLIST_MAGIC) {
        return Err(decode_err("not a binary property list"));
    }

    let archive =
        Value::from_reader(Cursor::new(data)).map_err(|e| decode_err(e.to_string()))?;
    let archive = archive
        .as_dictionary()
        .ok_or_else(|| decode_err("top level is not a dictionary"))?;

    let objects = archive
        .get("$objects")
        .and_then(Value::as_array)
        .ok_or_else(|| decode_err("missing $objects"))?;
    let root = archive
        .get("$top")
        .and_then(Value::as_dictionary)
        .and_then(|top| top.get("root"))
        .ok_or_else(|| decode_err("missing $top.root"))?;

    let root = resolve(root, objects)?;
    string_of(root, objects, 0)
}

fn resolve<'a>(value: &'a Value, objects: &'a [Value]) -> Result<&'a Value> {
    match value {
        Value::Uid(uid) => usize::try_from(uid.get())
            .ok()
            .and_then(|idx| objects.get(idx))
            .ok_or_else(|| decode_err(format!("dangling UID {}", uid.get()))),
        other => Ok(other),
    }
}

fn string_of(object: &Value, objects: &[Value], depth: usize) -> Result<String> {
    if depth > MAX_DEPTH {
        return Err(decode_err("string reference chain too deep"));
    }
    match object {
        Value::String(s) => Ok(s.clone()),
        Value::Dictionary(dict) => {
            let inner = STRING_KEYS
                .iter()
                .find_map(|key| dict.get(key))
                .ok_or_else(|| decode_err("root object has no string payload"))?;
            string_of(resolve(inner, objects)?, objects, depth + 1)
        }
        _ => Err(decode_err("unexpected object type for string payload")),
    }
}

/// Build a keyed archive of an attributed string. Test-only.
#[cfg(test)]
pub(crate) fn encode_for_test(text: &str) -> Vec<u8> {
    use plist::{Dictionary, Uid};

    let mut string_obj = Dictionary::new();
    string_obj.insert("NS.string".into(), Value::String(text.to_string()));
    string_obj.insert("$class".into(), Value::Uid(Uid::new(4)));

    let mut attributed = Dictionary::new();
    attributed.insert("NSString".into(), Value::Uid(Uid::new(2)));
    attributed.insert("$class".into(), Value::Uid(Uid::new(3)));

    let mut attributed_class = Dictionary::new();
    attributed_class.insert(
        "$classname".into(),
        Value::String("NSAttributedString".into()),
    );
    let mut string_class = Dictionary::new();
    string_class.insert("$classname".into(), Value::String("NSMutableString".into()));

    let mut top = Dictionary::new();
    top.insert("root".into(), Value::Uid(Uid::new(1)));

    let mut archive = Dictionary::new();
    archive.insert("$archiver".into(), Value::String("NSKeyedArchiver".into()));
    archive.insert("$version".into(), Value::Integer(100_000i64.into()));
    archive.insert("$top".into(), Value::Dictionary(top));
    archive.insert(
        "$objects".into(),
        Value::Array(vec![
            Value::String("$null".into()),
            Value::Dictionary(attributed),
            Value::Dictionary(string_obj),
            Value::Dictionary(attributed_class),
            Value::Dictionary(string_class),
        ]),
    );

    let mut buf = Vec::new();
    Value::Dictionary(archive)
        .to_writer_binary(&mut buf)
        .expect("in-memory plist write");
    buf
}

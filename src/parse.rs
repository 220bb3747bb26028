//! JSON text → [`Value`], with positions and JSON-path context on failure.
use crate::error::ParseError;
use crate::value::Value;

/// Parse exactly one document. Trailing non-whitespace is an error.
pub fn parse_document(src: &str) -> Result<Value, ParseError> {
    parse_at(src, 0)
}

/// One document per non-blank line. Reported lines are relative to `src`.
pub fn parse_ndjson(src: &str) -> impl Iterator<Item = Result<Value, ParseError>> + '_ {
    src.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(ix, line)| parse_at(line, ix))
}

fn parse_at(src: &str, line_offset: usize) -> Result<Value, ParseError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    let value = match serde_path_to_error::deserialize::<_, Value>(&mut *de) {
        Ok(v) => v,
        Err(err) => {
            let path = err.path().to_string();
            let path = if path == "." { None } else { Some(path) };
            return Err(ParseError::from_serde(err.into_inner(), path, line_offset));
        }
    };
    de.end().map_err(|err| ParseError::from_serde(err, None, line_offset))?;
    Ok(value)
}

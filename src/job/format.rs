//! Result formatting
//!
//! Pure functions turning lookup results into the text written to output
//! sinks and backup files.

/// Value shown for a key that READ could not find
pub const ERROR_MARKER: &str = "KVSERROR";

/// Value shown for a key that DELETE could not find
pub const MISSING_MARKER: &str = "KVSMISSING";

/// `[(k1,v1)(k2,KVSERROR)...]`, in the order given
pub fn format_read<K, V>(results: &[(K, Option<V>)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::from("[");
    for (key, value) in results {
        let value = value.as_ref().map_or(ERROR_MARKER, |v| v.as_ref());
        out.push('(');
        out.push_str(key.as_ref());
        out.push(',');
        out.push_str(value);
        out.push(')');
    }
    out.push(']');
    out
}

/// `[(k1,KVSMISSING)...]`, or an empty string when nothing was missing
pub fn format_delete<K: AsRef<str>>(missing: &[K]) -> String {
    if missing.is_empty() {
        return String::new();
    }

    let mut out = String::from("[");
    for key in missing {
        out.push('(');
        out.push_str(key.as_ref());
        out.push(',');
        out.push_str(MISSING_MARKER);
        out.push(')');
    }
    out.push(']');
    out
}

/// One SHOW / backup line: `(key, value)`
pub fn format_pair(key: &str, value: &str) -> String {
    format!("({}, {})", key, value)
}

/// Inverse of [`format_pair`]
pub fn parse_pair_line(line: &str) -> Option<(String, String)> {
    let inner = line.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (key, value) = inner.split_once(", ")?;
    Some((key.to_string(), value.to_string()))
}

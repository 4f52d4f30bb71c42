// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fetch loosely-typed columns from JSON rows by dotted path or alias list, with lossy scalar coercion
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper for scalar, integer and array extraction
// invariants: No panics; missing paths and JSON null yield None; numbers and strings coerce into each other where lossless
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;

/// Wrapper around a JSON location to allow typed extraction via a clear second step.
pub struct JsonFetched<'a> {
  inner: Option<&'a Value>,
}

impl<'a> JsonFetched<'a> {
  /// Render a scalar as a string: strings as-is, numbers and bools via Display.
  pub fn text(&self) -> Option<String> {
    match self.inner? {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      Value::Bool(b) => Some(b.to_string()),
      _ => None,
    }
  }

  /// Integer view of a number or numeric string; fractional values with no remainder are accepted.
  pub fn int(&self) -> Option<i64> {
    match self.inner? {
      Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
      Value::String(s) => s.trim().parse::<i64>().ok(),
      _ => None,
    }
  }

  pub fn array(&self) -> Option<&'a Vec<Value>> {
    self.inner.and_then(|v| v.as_array())
  }

  pub fn is_present(&self) -> bool {
    self.inner.is_some()
  }
}

/// Extension to fetch nested values via dotted paths like "user.login".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;

  /// First alias that resolves to a non-null value.
  fn fetch_any(&self, aliases: &[&str]) -> JsonFetched<'_>;
}

impl JsonFetch for Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      match cur.get(key) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    if cur.is_null() {
      return JsonFetched { inner: None };
    }

    JsonFetched { inner: Some(cur) }
  }

  fn fetch_any(&self, aliases: &[&str]) -> JsonFetched<'_> {
    for alias in aliases {
      let f = self.fetch(alias);
      if f.is_present() {
        return f;
      }
    }
    JsonFetched { inner: None }
  }
}

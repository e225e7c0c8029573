//! Redis-style glob matching for the in-memory store
//!
//! Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes, read the
//! way Redis reads them: a `[` with no closing `]` runs to the end of the
//! pattern, and `x-y` is a range whenever a char follows the `-`, even `]`.

use regex::Regex;

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
  source: String,
  regex: Option<Regex>,
}

impl GlobPattern {
  pub fn new(pattern: &str) -> Self {
    let regex = glob_to_regex(pattern).and_then(|re| Regex::new(&re).ok());
    if regex.is_none() {
      tracing::debug!("Glob pattern {:?} matches nothing", pattern);
    }
    Self {
      source: pattern.to_string(),
      regex,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }

  pub fn matches(&self, key: &str) -> bool {
    match &self.regex {
      Some(re) => re.is_match(key),
      None => false,
    }
  }
}

/// Convert a glob pattern to an anchored regex.
/// Returns `None` for patterns that can never match (an empty class like `[]`).
fn glob_to_regex(pattern: &str) -> Option<String> {
  let chars: Vec<char> = pattern.chars().collect();
  let mut regex_str = String::with_capacity(pattern.len() * 2 + 8);
  regex_str.push_str("(?s)^");

  let mut i = 0;
  while i < chars.len() {
    match chars[i] {
      '*' => {
        // Collapse runs of stars
        while i + 1 < chars.len() && chars[i + 1] == '*' {
          i += 1;
        }
        regex_str.push_str(".*");
      }
      '?' => regex_str.push('.'),
      '\\' if i + 1 < chars.len() => {
        i += 1;
        push_literal(&mut regex_str, chars[i]);
      }
      '[' => {
        let (class, consumed) = parse_class(&chars[i + 1..]);
        regex_str.push_str(&class?);
        i += consumed;
      }
      c => push_literal(&mut regex_str, c),
    }
    i += 1;
  }

  regex_str.push('$');
  Some(regex_str)
}

/// Parse a bracket class body (after the opening `[`).
///
/// Returns the regex fragment (`None` if the class can never match) and the
/// number of chars consumed, including the closing `]` when there is one.
fn parse_class(body: &[char]) -> (Option<String>, usize) {
  let mut i = 0;
  let negated = body.first() == Some(&'^');
  if negated {
    i += 1;
  }

  let mut members: Vec<(char, char)> = Vec::new();
  while i < body.len() {
    let c = body[i];
    if c == '\\' && i + 1 < body.len() {
      members.push((body[i + 1], body[i + 1]));
      i += 2;
    } else if c == ']' {
      i += 1;
      break;
    } else if i + 2 < body.len() && body[i + 1] == '-' {
      let end = body[i + 2];
      let (lo, hi) = if c <= end { (c, end) } else { (end, c) };
      members.push((lo, hi));
      i += 3;
    } else {
      members.push((c, c));
      i += 1;
    }
  }

  let consumed = i;
  if members.is_empty() {
    return (negated.then(|| ".".to_string()), consumed);
  }

  let mut class = String::from("[");
  if negated {
    class.push('^');
  }
  for (lo, hi) in members {
    class.push_str(&regex::escape(&lo.to_string()));
    if lo != hi {
      class.push('-');
      class.push_str(&regex::escape(&hi.to_string()));
    }
  }
  class.push(']');
  (Some(class), consumed)
}

fn push_literal(out: &mut String, c: char) {
  let mut buf = [0u8; 4];
  out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

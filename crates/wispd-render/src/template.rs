//! minimal `{{ ... }}` string templating over the variable bag.
//!
//! supports value actions (`{{ .device_name }}`) and the four functions
//! `upper`, `lower`, `default` and `join`. missing keys resolve to the
//! zero value (rendered as the empty string); any parse error makes the
//! whole string render as itself, verbatim.

use serde_json::{Map, Value};

use crate::netjson::lookup;

/// render a template string. never fails; bad templates come back unchanged.
pub(crate) fn render(input: &str, vars: &Map<String, Value>) -> String {
    match try_render(input, vars) {
        Ok(rendered) => rendered,
        Err(_) => input.to_string(),
    }
}

#[derive(Debug)]
struct ParseError;

fn try_render(input: &str, vars: &Map<String, Value>) -> Result<String, ParseError> {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(ParseError)?;
        out.push_str(&eval_action(after[..end].trim(), vars)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn eval_action(action: &str, vars: &Map<String, Value>) -> Result<String, ParseError> {
    let terms = tokenize(action)?;
    let (head, args) = terms.split_first().ok_or(ParseError)?;

    // a lone value term: `.path` or a literal
    if head.starts_with('.') || head.starts_with('"') {
        if !args.is_empty() {
            return Err(ParseError);
        }
        return Ok(display(&eval_term(head, vars)?));
    }

    // otherwise a function call
    let args: Vec<Value> = args
        .iter()
        .map(|t| eval_term(t, vars))
        .collect::<Result<_, _>>()?;
    match (head.as_str(), args.as_slice()) {
        ("upper", [v]) => Ok(display(v).to_uppercase()),
        ("lower", [v]) => Ok(display(v).to_lowercase()),
        ("default", [def, v]) => Ok(display(if is_zero(v) { def } else { v })),
        ("join", [Value::Array(items), sep]) => {
            let sep = display(sep);
            Ok(items
                .iter()
                .map(display)
                .collect::<Vec<_>>()
                .join(&sep))
        }
        _ => Err(ParseError),
    }
}

/// split an action into terms, honouring double-quoted literals.
fn tokenize(action: &str) -> Result<Vec<String>, ParseError> {
    let mut terms = Vec::new();
    let mut chars = action.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::from('"');
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => literal.push(ch),
                    None => return Err(ParseError),
                }
            }
            terms.push(literal);
        } else {
            let mut term = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                term.push(ch);
                chars.next();
            }
            terms.push(term);
        }
    }
    Ok(terms)
}

/// evaluate one term to a json value.
///
/// `.a.b` looks up the bag (missing -> null, the zero value), `"x"` is a
/// string literal, digits are numbers; anything else is a parse error.
fn eval_term(term: &str, vars: &Map<String, Value>) -> Result<Value, ParseError> {
    if let Some(path) = term.strip_prefix('.') {
        if path.is_empty() {
            return Err(ParseError);
        }
        return Ok(lookup(vars, path).cloned().unwrap_or(Value::Null));
    }
    if let Some(literal) = term.strip_prefix('"') {
        return Ok(Value::String(literal.to_string()));
    }
    if let Ok(n) = term.parse::<i64>() {
        return Ok(Value::Number(n.into()));
    }
    Err(ParseError)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag() -> Map<String, Value> {
        match json!({
            "device_name": "node1",
            "model": "",
            "mac": "aa:bb:cc:dd:ee:01",
            "net": {"dns": ["1.1.1.1", "8.8.8.8"]},
            "count": 0,
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn plain_value() {
        assert_eq!(render("host-{{ .device_name }}", &bag()), "host-node1");
    }

    #[test]
    fn nested_path() {
        assert_eq!(
            render("{{ join .net.dns \",\" }}", &bag()),
            "1.1.1.1,8.8.8.8"
        );
    }

    #[test]
    fn upper_and_lower() {
        assert_eq!(render("{{ upper .device_name }}", &bag()), "NODE1");
        assert_eq!(render("{{ lower .mac }}", &bag()), "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn default_replaces_zero_values() {
        assert_eq!(render("{{ default \"x86\" .model }}", &bag()), "x86");
        assert_eq!(
            render("{{ default \"fallback\" .device_name }}", &bag()),
            "node1"
        );
        assert_eq!(render("{{ default 9 .count }}", &bag()), "9");
    }

    #[test]
    fn missing_key_renders_empty() {
        assert_eq!(render("[{{ .nope }}]", &bag()), "[]");
        assert_eq!(render("[{{ .nope.deeper }}]", &bag()), "[]");
    }

    #[test]
    fn parse_errors_return_input_verbatim() {
        assert_eq!(render("{{ .unterminated", &bag()), "{{ .unterminated");
        assert_eq!(render("{{ frobnicate .x }}", &bag()), "{{ frobnicate .x }}");
        assert_eq!(render("{{ }}", &bag()), "{{ }}");
        assert_eq!(render("{{ \"open", &bag()), "{{ \"open");
    }

    #[test]
    fn text_without_actions_is_untouched() {
        assert_eq!(render("just text", &bag()), "just text");
    }

    #[test]
    fn multiple_actions_in_one_string() {
        assert_eq!(
            render("{{ .device_name }}-{{ upper .device_name }}", &bag()),
            "node1-NODE1"
        );
    }
}

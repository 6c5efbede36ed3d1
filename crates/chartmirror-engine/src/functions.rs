//! Global template functions

use minijinja::{Error, ErrorKind, State, Value};
use std::cell::Cell;

/// Nesting limit for `tpl`, values that template themselves stop here
const MAX_TPL_DEPTH: usize = 10;

thread_local! {
    // Each nested `tpl` renders in a fresh minijinja state, so the depth
    // lives outside of it. Rendering never crosses threads.
    static TPL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Usage: {{ fail("image.repository must be set") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Build a mapping from alternating keys and values
///
/// Usage: {{ dict("registry", "docker.io", "tag", "latest") }}
pub fn dict(args: Vec<Value>) -> Result<Value, Error> {
    if !args.len().is_multiple_of(2) {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut map = serde_json::Map::new();
    for pair in args.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "dict keys must be strings"))?;
        let value = serde_json::to_value(&pair[1])
            .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
        map.insert(key.to_string(), value);
    }

    Ok(Value::from_serialize(serde_json::Value::Object(map)))
}

/// Usage: {{ list("a", "b") }}
pub fn list(args: Vec<Value>) -> Value {
    Value::from(args)
}

/// Attribute lookup with a fallback
///
/// Usage: {{ get(values.image, "tag", "latest") }}
pub fn get(obj: Value, key: String, default: Option<Value>) -> Value {
    match obj.get_attr(&key) {
        Ok(v) if !v.is_undefined() => v,
        _ => default.unwrap_or(Value::UNDEFINED),
    }
}

/// First argument that is defined, not none and not an empty string
///
/// Usage: {{ coalesce(values.image.tag, chart.appVersion, "latest") }}
pub fn coalesce(args: Vec<Value>) -> Value {
    args.into_iter()
        .find(|arg| {
            !arg.is_undefined()
                && !arg.is_none()
                && !arg.as_str().map(str::is_empty).unwrap_or(false)
        })
        .unwrap_or(Value::UNDEFINED)
}

/// Usage: {{ ternary("Always", "IfNotPresent", values.devMode) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() { true_val } else { false_val }
}

/// Go-style formatting for the common verbs: `%s`, `%v`, `%d`, `%f`, `%%`
///
/// Usage: {{ printf("%s/%s:%s", registry, repository, tag) }}
pub fn printf(format: String, args: Vec<Value>) -> Result<String, Error> {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let verb = match chars.next() {
            Some('%') => {
                out.push('%');
                continue;
            }
            Some(verb) => verb,
            None => {
                out.push('%');
                break;
            }
        };

        let arg = args.next().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                "not enough arguments for format string",
            )
        })?;

        match verb {
            'd' => match arg.as_i64() {
                Some(n) => out.push_str(&n.to_string()),
                None => out.push_str(&arg.to_string()),
            },
            'f' => match f64::try_from(arg.clone()) {
                Ok(n) => out.push_str(&format!("{:.6}", n)),
                Err(_) => out.push_str(&arg.to_string()),
            },
            _ => out.push_str(&arg.to_string()),
        }
    }

    Ok(out)
}

/// Render a string from values as a template
///
/// Usage: {{ tpl(values.image.repository, {"values": values}) }}
pub fn tpl(state: &State, template: String, context: Value) -> Result<String, Error> {
    if !template.contains("{{") && !template.contains("{%") {
        return Ok(template);
    }

    let level = TPL_DEPTH.with(|depth| {
        depth.set(depth.get() + 1);
        depth.get()
    });

    let result = if level > MAX_TPL_DEPTH {
        Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("tpl nesting exceeded {} levels", MAX_TPL_DEPTH),
        ))
    } else {
        state.env().render_str(&template, context).map_err(|e| {
            Error::new(ErrorKind::InvalidOperation, format!("tpl error: {}", e))
        })
    };

    TPL_DEPTH.with(|depth| depth.set(depth.get() - 1));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::Environment;

    #[test]
    fn test_dict() {
        let result = dict(vec![
            Value::from("repository"),
            Value::from("nginx"),
            Value::from("replicas"),
            Value::from(2),
        ])
        .unwrap();

        assert_eq!(result.get_attr("repository").unwrap().as_str(), Some("nginx"));
        assert!(dict(vec![Value::from("odd")]).is_err());
    }

    #[test]
    fn test_coalesce() {
        let picked = coalesce(vec![Value::UNDEFINED, Value::from(""), Value::from("1.0")]);
        assert_eq!(picked.as_str(), Some("1.0"));
        assert!(coalesce(vec![]).is_undefined());
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            ternary(Value::from("yes"), Value::from("no"), Value::from(true)).as_str(),
            Some("yes")
        );
        assert_eq!(
            ternary(Value::from("yes"), Value::from("no"), Value::from(false)).as_str(),
            Some("no")
        );
    }

    #[test]
    fn test_printf() {
        let result = printf(
            "%s/%s:%d".to_string(),
            vec![Value::from("docker.io"), Value::from("nginx"), Value::from(1)],
        )
        .unwrap();
        assert_eq!(result, "docker.io/nginx:1");
        assert_eq!(printf("100%%".to_string(), vec![]).unwrap(), "100%");
        assert_eq!(
            printf("%f %f".to_string(), vec![Value::from(0.5), Value::from(2)]).unwrap(),
            "0.500000 2.000000"
        );
        assert!(printf("%s".to_string(), vec![]).is_err());
    }

    #[test]
    fn test_tpl() {
        let mut env = Environment::new();
        env.add_function("tpl", tpl);

        let rendered = env
            .render_str(r#"{{ tpl("{{ registry }}/app", {"registry": "quay.io"}) }}"#, ())
            .unwrap();
        assert_eq!(rendered, "quay.io/app");

        let plain = env.render_str(r#"{{ tpl("nginx", {}) }}"#, ()).unwrap();
        assert_eq!(plain, "nginx");
    }

    #[test]
    fn test_tpl_nesting_limit() {
        let mut env = Environment::new();
        env.add_function("tpl", tpl);

        let looping = r#"{{ tpl(t, {"t": t}) }}"#;
        let err = env
            .render_str("{{ tpl(t, {\"t\": t}) }}", minijinja::context! { t => looping })
            .unwrap_err();
        assert!(err.to_string().contains("tpl"));
    }
}

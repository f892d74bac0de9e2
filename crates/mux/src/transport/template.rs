//! Rendering of API gateway resource templates such as `/users/{id}` or
//! `/{proxy+}` against the path parameters of an event.

use std::collections::BTreeMap;

use crate::error::TemplateError;

/// The greedy placeholder gateways use to forward every path to one handler
pub(crate) const GREEDY_PROXY: &str = "{proxy+}";

/// Replaces every `{name}` and `{name+}` in `resource` with the value of the
/// parameter `name`.
///
/// # Errors
///
/// `Unclosed` when a `{` has no matching `}`, `MissingParameter` when a
/// placeholder names a parameter that is absent.
pub fn render_resource(resource: &str, params: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(resource.len());
    let mut rest = resource;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            return Err(TemplateError::Unclosed { resource: resource.to_owned() });
        };

        let name = after[..end].trim_end_matches('+');
        let value = params.get(name).ok_or_else(|| TemplateError::MissingParameter { name: name.to_owned() })?;
        rendered.push_str(value);
        rest = &after[end + 1..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn renders_placeholders() {
        let params = params(&[("id", "42"), ("proxy", "a/b/c")]);
        assert_eq!(render_resource("/users/{id}", &params).unwrap(), "/users/42");
        assert_eq!(render_resource("/{proxy+}", &params).unwrap(), "/a/b/c");
        assert_eq!(render_resource("/static", &params).unwrap(), "/static");
    }

    #[test]
    fn reports_failures() {
        let params = params(&[("id", "42")]);
        assert_eq!(render_resource("/users/{id", &params), Err(TemplateError::Unclosed { resource: "/users/{id".to_owned() }));
        assert_eq!(render_resource("/users/{name}", &params), Err(TemplateError::MissingParameter { name: "name".to_owned() }));
    }
}

//! `@http`: resolves fields against HTTP endpoints.

use super::{add_resolver, names, required_str_arg, TransformPass};
use crate::context::{Resource, ResourceKind, TransformContext};
use crate::error::{TransformError, TransformResult};

const METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];
const STACK: &str = "HttpStack";

#[derive(Debug, Default)]
pub struct HttpPass;

impl HttpPass {
    pub fn new() -> Self {
        Self
    }
}

/// Split `https://host/path` into `(origin, path)`.
fn split_url(url: &str) -> Option<(&str, &str)> {
    let scheme_end = if url.starts_with("https://") {
        "https://".len()
    } else if url.starts_with("http://") {
        "http://".len()
    } else {
        return None;
    };
    match url[scheme_end..].find('/') {
        Some(i) => Some((&url[..scheme_end + i], &url[scheme_end + i..])),
        None => Some((url, "/")),
    }
}

impl TransformPass for HttpPass {
    fn name(&self) -> &str {
        names::HTTP
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut endpoints = Vec::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::HTTP) {
            let location = format!("{}.{}", definition.name, field.name);
            let directive = match field.directive(names::HTTP) {
                Some(d) => d,
                None => continue,
            };
            let url = required_str_arg(names::HTTP, directive, "url", &location)?;
            let (origin, path) = split_url(url).ok_or_else(|| {
                TransformError::directive(
                    names::HTTP,
                    format!("@http on {} must use an http(s) url, got '{}'", location, url),
                )
            })?;
            let method = directive
                .argument("method")
                .and_then(|v| v.as_str())
                .unwrap_or("GET")
                .to_ascii_uppercase();
            if !METHODS.contains(&method.as_str()) {
                return Err(TransformError::directive(
                    names::HTTP,
                    format!("@http on {} uses unsupported method {}", location, method),
                ));
            }
            endpoints.push((
                definition.name.clone(),
                field.name.clone(),
                origin.to_string(),
                path.to_string(),
                method,
            ));
        }

        for (type_name, field_name, origin, path, method) in endpoints {
            let host: String = origin
                .split("://")
                .nth(1)
                .unwrap_or(origin.as_str())
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect();
            let datasource = format!("{}DataSource", host);
            if !ctx.resources.contains(&datasource) {
                ctx.resources.add(
                    Resource::new(datasource.clone(), ResourceKind::DataSource)
                        .in_stack(STACK)
                        .with_property("type", "HTTP".into())
                        .with_property("endpoint", origin.into()),
                );
            }
            let resolver = add_resolver(ctx, &type_name, &field_name, &datasource, Some(STACK));
            resolver.set_property("method", method.into());
            resolver.set_property("resourcePath", path.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::split_url;

    #[test]
    fn splits_origin_and_path() {
        assert_eq!(
            split_url("https://api.example.com/v1/items"),
            Some(("https://api.example.com", "/v1/items"))
        );
        assert_eq!(split_url("http://example.com"), Some(("http://example.com", "/")));
        assert_eq!(split_url("ftp://example.com"), None);
    }
}

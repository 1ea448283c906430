/// The result of matching a path template against a concrete request target:
/// an ordered mapping from template variable names to their captured values.
///
/// Kept as an ordered `Vec` rather than a `HashMap` (see Data Model notes)
/// since `OperationId`'s own template is itself ordered and callers
/// typically know the field name they want by position as much as by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathShape(Vec<(String, String)>);

impl PathShape {
    /// Returns the captured value for a template variable, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over the captures in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Matches a `{name}`-style path template against a request's path segments.
///
/// Literal segments compare case-insensitively; a `{name}` segment matches
/// any single non-empty segment and is captured by name. Returns `None` on
/// arity mismatch or a literal-segment mismatch.
#[must_use]
pub fn match_template(template: &str, request_segments: &[String]) -> Option<PathShape> {
    let template_segments: Vec<&str> = template
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    if template_segments.len() != request_segments.len() {
        return None;
    }

    let mut captures = Vec::new();
    for (template_segment, request_segment) in template_segments.iter().zip(request_segments) {
        if let Some(name) = template_segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            captures.push((name.to_string(), request_segment.clone()));
        } else if !template_segment.eq_ignore_ascii_case(request_segment) {
            return None;
        }
    }

    Some(PathShape(captures))
}

/// Normalizes a path template for use as a route-table key: strips a single
/// trailing slash, per §6's "no trailing-slash normalization beyond
/// stripping a single trailing `/`".
#[must_use]
pub fn normalize_template(template: &str) -> &str {
    template.strip_suffix('/').unwrap_or(template)
}

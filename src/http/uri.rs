/// The request target decomposed into path segments and a query map.
///
/// Query parameter names and values are matched case-sensitively; this
/// module does no normalization beyond percent-decoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Uri {
    /// The non-empty path segments, in order, with a leading `/` implied.
    ///
    /// `/` itself decomposes to an empty `Vec`.
    pub segments: Vec<String>,
    /// The query parameters, in the order they appeared on the wire.
    pub query: Vec<(String, String)>,
}

impl Uri {
    /// Parses a raw request target (e.g. `/coffee/42?size=large&size=xl`)
    /// into path segments and a query map.
    ///
    /// Empty segments produced by repeated slashes are dropped, matching how
    /// most path-template matchers treat `/foo//bar` and `/foo/bar` as
    /// equivalent.
    #[must_use]
    pub fn parse(request_target: &str) -> Self {
        let (path, query) = match request_target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (request_target, None),
        };

        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| percent_decode(segment))
            .collect();

        let query = query.map_or_else(Vec::new, parse_query);

        Self { segments, query }
    }

    /// Returns the value for a query parameter name, if present.
    ///
    /// A repeated key keeps only the last occurrence, matching
    /// `Headers::insert`'s last-write-wins semantics.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::Uri;

    #[test]
    fn parses_root() {
        let uri = Uri::parse("/");
        assert!(uri.segments.is_empty());
        assert!(uri.query.is_empty());
    }

    #[test]
    fn parses_path_and_query() {
        let uri = Uri::parse("/coffee/42?size=large&decaf=true");
        assert_eq!(uri.segments, vec!["coffee", "42"]);
        assert_eq!(uri.query_param("size"), Some("large"));
        assert_eq!(uri.query_param("decaf"), Some("true"));
    }

    #[test]
    fn collapses_repeated_slashes() {
        let uri = Uri::parse("/coffee//42/");
        assert_eq!(uri.segments, vec!["coffee", "42"]);
    }

    #[test]
    fn query_param_names_are_case_sensitive() {
        let uri = Uri::parse("/coffee?Size=large");
        assert_eq!(uri.query_param("Size"), Some("large"));
        assert_eq!(uri.query_param("size"), None);
    }

    #[test]
    fn decodes_percent_and_plus() {
        let uri = Uri::parse("/search?q=dark%20roast+coffee");
        assert_eq!(uri.query_param("q"), Some("dark roast coffee"));
    }

    #[test]
    fn repeated_query_key_keeps_last_via_query_param() {
        let uri = Uri::parse("/coffee?size=large&size=xl");
        assert_eq!(uri.query_param("size"), Some("xl"));
        assert_eq!(uri.query.len(), 2);
    }
}

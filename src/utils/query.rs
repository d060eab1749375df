//! RFC 3986 query string encoding and parsing.
//!
//! The canonical form signed by the host platform percent-encodes every byte
//! outside the RFC 3986 unreserved set (`A-Z a-z 0-9 - . _ ~`), encodes a
//! space as `%20` and joins `key=value` pairs with `&`.

use url::form_urlencoded;

/// Separator between `key=value` pairs
pub const ARG_SEPARATOR: char = '&';

/// Percent-encode a single key or value per RFC 3986
///
/// `form_urlencoded` implements the HTML form flavour, which differs from
/// RFC 3986 in three places: space becomes `+`, `*` is left alone and `~` is
/// escaped. Those are patched up here.
pub fn encode_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for chunk in form_urlencoded::byte_serialize(input.as_bytes()) {
        encoded.push_str(chunk);
    }

    encoded
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Serialize `key=value` pairs in the given order
pub fn build_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut query = String::new();
    for (key, value) in pairs {
        if !query.is_empty() {
            query.push(ARG_SEPARATOR);
        }
        query.push_str(&encode_component(key));
        query.push('=');
        query.push_str(&encode_component(value));
    }
    query
}

/// Parse a query string into decoded `(key, value)` pairs, preserving order
///
/// Both `%20` and `+` decode to a space. A leading `?` is ignored.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

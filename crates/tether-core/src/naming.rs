//! Accessor naming conventions.
//!
//! Native getters are written `getX`, `get_x` or `GetX`; the caller sees a
//! property called `x`. [`normalize`] performs that reshaping. It borrows
//! from the raw name whenever it can and only allocates when the first
//! character of the property has to be lowercased.

use std::borrow::Cow;

/// Strip a `get`/`Get` prefix from a raw getter name.
///
/// # Rules
///
/// - Names of three bytes or fewer, and names not starting with `get` or
///   `Get`, are returned unchanged.
/// - `get_foo` becomes `foo`.
/// - `getfoo` becomes `foo`.
/// - `getFoo` becomes `foo` (owned, first letter lowercased).
/// - `getFOO` becomes `FOO`; a second capital marks an acronym.
/// - Any other fourth character leaves the name unchanged.
///
/// If the owned buffer cannot be allocated the raw name is returned.
///
/// # Example
///
/// ```
/// use tether_core::naming::normalize;
///
/// assert_eq!(normalize("getX"), "x");
/// assert_eq!(normalize("getURL"), "URL");
/// assert_eq!(normalize("value"), "value");
/// ```
pub fn normalize(raw: &str) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    if bytes.len() <= 3 || bytes[0].to_ascii_lowercase() != b'g' || &bytes[1..3] != b"et" {
        return Cow::Borrowed(raw);
    }

    match bytes[3] {
        b'_' => Cow::Borrowed(&raw[4..]),
        b'a'..=b'z' => Cow::Borrowed(&raw[3..]),
        b'A'..=b'Z' => {
            if bytes.get(4).is_some_and(u8::is_ascii_uppercase) {
                Cow::Borrowed(&raw[3..])
            } else {
                lowercase_first(raw, &raw[3..])
            }
        }
        _ => Cow::Borrowed(raw),
    }
}

fn lowercase_first<'a>(raw: &'a str, rest: &str) -> Cow<'a, str> {
    let mut owned = String::new();
    if owned.try_reserve_exact(rest.len()).is_err() {
        return Cow::Borrowed(raw);
    }
    owned.push_str(rest);
    owned[..1].make_ascii_lowercase();
    Cow::Owned(owned)
}

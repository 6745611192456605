use convert_case::{Case, Casing};
use rand::{thread_rng, Rng};
use uuid::Uuid;

/// Returns a lowercase, hexadecimal encoded UUID that is also guaranteed to be a valid
/// RFC 1035 label. See [RFC 1035](https://datatracker.ietf.org/doc/html/rfc1035).
///
/// Kubernetes requires DNS-1035 labels for some generated identifiers. Failure to comply
/// results in the following error message from the API server:
///
/// ```text
/// a DNS-1035 label must consist of lower case alphanumeric characters or '-', start with
/// an alphabetic character, and end with an alphanumeric character (e.g. 'my-name', or
/// 'abc-123', regex used for validation is '[a-z]([-a-z0-9]*[a-z0-9])?'
/// ```
pub fn rfc1035_label() -> String {
    let mut name = uuid();
    if !name.starts_with(char::is_alphabetic) {
        name.remove(0);
        name.insert(0, thread_rng().gen_range('a'..='z'))
    }
    name
}

const DEFAULT_IF_INVALID_SUBDOMAIN: &str = "invalid-rfc1123-pod-name";

/// Takes a prefix, normalizes it, and suffixes it with at least eight bytes of a UUID so
/// the result is a valid RFC 1123 subdomain usable as a pod's `metadata.name`.
///
/// Normalization:
/// * 1. All non-alphanumeric characters are converted to a space.
/// * 2. The result of #1 is converted to a lowercase kebab-case string.
///     * If the result is empty, `invalid-rfc1123-pod-name` is used as the prefix instead.
/// * 3. A lowercase, hexadecimal UUID is appended.
///     * If prefix + suffix fits within 63 bytes, the full UUID is kept.
///     * If the prefix alone leaves room for fewer than 8 bytes of UUID, the prefix is
///       truncated to 54 bytes and 8 bytes of UUID are appended.
///     * Otherwise the UUID is truncated so prefix + suffix is exactly 63 bytes.
///
/// See [RFC 1123 §2.1](https://datatracker.ietf.org/doc/html/rfc1123#section-2) for the
/// subdomain syntax this produces.
pub fn rfc1123_subdomain<T: AsRef<str>>(prefix: T) -> String {
    let mut uuid = uuid();
    let mut prefix = prefix
        .as_ref()
        .chars()
        .into_iter()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_case(Case::Kebab);
    if prefix.is_empty() {
        prefix = DEFAULT_IF_INVALID_SUBDOMAIN.to_string();
    }
    // +1 because of the hyphen that separates {prefix}-{uuid}
    if uuid.len() + prefix.len() + 1 <= 63 {
        // fits as-is
    } else if prefix.len() + 9 > 63 {
        prefix.truncate(63 - 9);
        uuid.truncate(8);
    } else {
        let ulen = 63 - 1 - prefix.len();
        uuid.truncate(ulen);
    }
    debug_assert!(prefix.len() + uuid.len() <= 63);
    debug_assert!(uuid.len() >= 8);
    format!("{}-{}", prefix, uuid)
}

/// Returns a randomly generated, lowercase, hexadecimal UUID string.
pub fn uuid() -> String {
    Uuid::from_u128(thread_rng().gen()).to_simple().to_string()
}

/// Derive the URL/path-safe `code` for a repository display name.
///
/// ASCII alphanumerics are lower-cased and kept, each space, hyphen or
/// underscore becomes a single `-`, and every other character is dropped.
/// Separator runs are not collapsed, so `"a  b"` yields `"a--b"`.
pub fn create_code(name: &str) -> String {
    let mut code = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            code.push(c.to_ascii_lowercase());
        } else if matches!(c, ' ' | '-' | '_') {
            code.push('-');
        }
    }
    code
}

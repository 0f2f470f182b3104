use syn::Path;

/// Compares the trailing segments of `path` with `expect`, so that both
/// `String` and `std::string::String` match `["std", "string", "String"]`.
pub(crate) fn matches_path(path: &Path, expect: &[&str]) -> bool {
    let len = path.segments.len().min(expect.len());
    path.segments.len() <= expect.len()
        && path
            .segments
            .iter()
            .rev()
            .take(len)
            .map(|v| &v.ident)
            .eq(expect.iter().rev().take(len))
}

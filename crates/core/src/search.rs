//! Substring search over fetched lists.

/// Case-insensitive substring match of `query` against any of `fields`.
///
/// A blank query matches everything.
pub fn matches_query<'a>(query: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

use crate::constants::BASE_GROUP;
use std::collections::HashSet;

/// Elements of `left` that also appear in `right`, in `left`'s order and
/// without duplicates.
pub fn intersection<L, R>(left: &[L], right: &[R]) -> Vec<String>
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    let lookup: HashSet<&str> = right.iter().map(AsRef::as_ref).collect();
    let mut seen = HashSet::new();
    left.iter()
        .map(AsRef::as_ref)
        .filter(|item| lookup.contains(item) && seen.insert(*item))
        .map(ToOwned::to_owned)
        .collect()
}

/// Concatenates both lists, keeping the first occurrence of every name.
pub fn merge_unique<I, S>(head: &[&str], tail: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let candidates = head
        .iter()
        .map(|name| (*name).to_string())
        .chain(tail.into_iter().map(Into::into));
    for name in candidates {
        if seen.insert(name.clone()) {
            merged.push(name);
        }
    }
    merged
}

/// The base group followed by `groups`, de-duplicated.
pub fn with_base_group<I, S>(groups: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    merge_unique(&[BASE_GROUP], groups)
}

use thiserror::Error;

pub mod settings;
pub mod task;
pub mod user;

#[cfg(test)]
pub(crate) mod test_util;

/// A value at the API boundary that doesn't name any known variant of an enumerated field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{value}` is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Looks `raw` up in a table of accepted spellings, ignoring case and surrounding whitespace.
fn parse_with_synonyms<T: Copy>(
    kind: &'static str,
    raw: &str,
    synonyms: &[(&str, T)],
) -> Result<T, UnknownVariant> {
    let normalized = raw.trim().to_lowercase();
    synonyms
        .iter()
        .find(|(spelling, _)| *spelling == normalized)
        .map(|(_, variant)| *variant)
        .ok_or_else(|| UnknownVariant {
            kind,
            value: raw.to_owned(),
        })
}

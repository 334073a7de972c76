//! Human-readable field names derived from column names

/// Title-case a column name for use as a remote field display name.
///
/// Words are split on `_`, `-`, whitespace, and camelCase boundaries. Each
/// word is capitalized unless it matches one of `acronyms`
/// (case-insensitively), in which case the acronym's own spelling is used.
///
/// ```
/// use mailsync_domain::utils::title::titleize;
///
/// assert_eq!(titleize::<&str>("first_name", &[]), "First Name");
/// assert_eq!(titleize("hsr_id", &["ID", "HSR"]), "HSR ID");
/// assert_eq!(titleize::<&str>("signupDate", &[]), "Signup Date");
/// ```
#[must_use]
pub fn titleize<S: AsRef<str>>(column: &str, acronyms: &[S]) -> String {
    split_words(column)
        .iter()
        .map(|word| {
            acronyms
                .iter()
                .map(AsRef::as_ref)
                .find(|acronym| acronym.eq_ignore_ascii_case(word))
                .map_or_else(|| capitalize(word), str::to_string)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn split_words(column: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in column.split(|c: char| c == '_' || c == '-' || c.is_whitespace()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = c.is_uppercase()
                && match prev {
                    Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                    // "HSRId": the last capital of a run starts the next word
                    Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                    _ => false,
                };

            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ACRONYMS;

    #[test]
    fn snake_case_becomes_title_case() {
        assert_eq!(titleize("first_name", DEFAULT_ACRONYMS), "First Name");
        assert_eq!(titleize("LAST_NAME", DEFAULT_ACRONYMS), "Last Name");
        assert_eq!(titleize("signup_date", DEFAULT_ACRONYMS), "Signup Date");
    }

    #[test]
    fn acronyms_keep_their_spelling() {
        assert_eq!(titleize("hsr_id", DEFAULT_ACRONYMS), "HSR ID");
        assert_eq!(titleize("member_ids", DEFAULT_ACRONYMS), "Member IDs");
        assert_eq!(titleize("HSRId", DEFAULT_ACRONYMS), "HSR ID");
        assert_eq!(titleize("crm_ref", &["CRM"]), "CRM Ref");
    }

    #[test]
    fn camel_case_and_digits_split() {
        assert_eq!(titleize("postCode", DEFAULT_ACRONYMS), "Post Code");
        assert_eq!(titleize("address2Line", DEFAULT_ACRONYMS), "Address2 Line");
    }

    #[test]
    fn separators_collapse() {
        assert_eq!(titleize("__home--phone  ", DEFAULT_ACRONYMS), "Home Phone");
        assert_eq!(titleize("", DEFAULT_ACRONYMS), "");
    }
}

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Any `&...;` run. Also swallows a bare `&` up to the next unrelated `;`,
/// e.g. `"AT&T; Bell"` becomes `" Bell"`.
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&[^;]*;").expect("valid entity regex"));

/// Clean a raw metadata string.
///
/// 1. `&#39;` becomes an apostrophe.
/// 2. Every `&...;` run is removed.
/// 3. Trailing spaces and commas are trimmed.
///
/// After step 2 no `&` is followed by a `;`, so a second pass changes nothing.
pub fn clean(s: &str) -> String {
    clean_keeping(s, &[])
}

/// Same as [`clean`], but entity runs listed in `keep` survive verbatim.
pub(crate) fn clean_keeping(s: &str, keep: &[&str]) -> String {
    let s = s.replace("&#39;", "'");
    let s = ENTITY_RE.replace_all(&s, |caps: &Captures| {
        let entity = &caps[0];
        if keep.contains(&entity) {
            entity.to_string()
        } else {
            String::new()
        }
    });
    trim_trailing_separators(&s).to_string()
}

fn trim_trailing_separators(s: &str) -> &str {
    s.trim_end_matches([' ', ','])
}

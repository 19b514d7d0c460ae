use std::path::Path;

/// Longest title part kept in a file name, in bytes. Leaves room for the
/// `_N` suffix and extension under the usual 255-byte name limit.
const MAX_TITLE_BYTES: usize = 200;

/// Relative path for a file named after `title` inside `dir`.
///
/// `/`, `?` and `#` become `_`, the file goes into a sub-folder named by the
/// first character of the title, and `_0`, `_1`, ... are appended until the
/// path is free. Long titles are cut to [`MAX_TITLE_BYTES`] on a character
/// boundary. An empty title lands directly in `dir`.
pub fn valid_file_name(dir: &Path, title: &str, extension: &str) -> String {
    let title = truncate(title, MAX_TITLE_BYTES).replace(['/', '?', '#'], "_");
    let folder: String = title.chars().take(1).collect();

    let candidate = |suffix: &str| {
        if folder.is_empty() {
            format!("{title}{suffix}{extension}")
        } else {
            format!("{folder}/{title}{suffix}{extension}")
        }
    };

    let mut file = candidate("");
    let mut attempt = 0usize;
    while dir.join(&file).exists() {
        file = candidate(&format!("_{attempt}"));
        attempt += 1;
    }
    file
}

fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

//! Version numbers derived from migration file names.

use std::cmp::Ordering;

/// Extract the version from a file's base name.
///
/// The version is the run of leading ASCII digits, so `001_init.sql`,
/// `01init.sql` and `1_init.sql` are all version 1. Returns 0 when the
/// name has no leading digit or the digits do not fit in an `i64`; callers
/// treat 0 as "not a migration".
pub fn extract_version(file_name: &str) -> i64 {
    let digits = file_name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return 0;
    }
    file_name[..digits].parse().unwrap_or(0)
}

/// Order file names by version, then by full name.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    extract_version(a)
        .cmp(&extract_version(b))
        .then_with(|| a.cmp(b))
}

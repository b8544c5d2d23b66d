//! Collision-free file naming.

use std::collections::HashSet;

/// Split a file name into `(stem, extension)`.
///
/// The extension starts at the last `.` of the final path component and
/// includes it.  Dots that only form a leading run (`.bashrc`, `..a`) do not
/// start an extension.
pub fn split_name(file_name: &str) -> (&str, &str) {
    let component_start = file_name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let Some(dot) = file_name.rfind('.').filter(|&d| d > component_start) else {
        return (file_name, "");
    };
    if file_name[component_start..dot].chars().all(|c| c == '.') {
        return (file_name, "");
    }
    file_name.split_at(dot)
}

/// Return `file_name` if it is not in `existing`, otherwise the first
/// `{stem}_{n}{ext}` (n = 1, 2, …) that is not.
pub fn resolve_unique_name(file_name: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(file_name) {
        return file_name.to_string();
    }

    let (stem, ext) = split_name(file_name);
    (1u64..)
        .map(|n| format!("{}_{}{}", stem, n, ext))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| file_name.to_string())
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("report.pdf"), ("report", ".pdf"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_name("README"), ("README", ""));
        assert_eq!(split_name(".bashrc"), (".bashrc", ""));
        assert_eq!(split_name("..a"), ("..a", ""));
        assert_eq!(split_name("..a.b"), ("..a", ".b"));
        assert_eq!(split_name("trailing."), ("trailing", "."));
        assert_eq!(split_name("dir.v2/notes"), ("dir.v2/notes", ""));
    }

    #[test]
    fn test_unique_name_unchanged_when_free() {
        assert_eq!(resolve_unique_name("a.txt", &set(&["b.txt"])), "a.txt");
    }

    #[test]
    fn test_unique_name_lowest_free_suffix() {
        let existing = set(&["a.txt", "a_1.txt"]);
        assert_eq!(resolve_unique_name("a.txt", &existing), "a_2.txt");
    }

    #[test]
    fn test_unique_name_fills_gaps() {
        let existing = set(&["a.txt", "a_2.txt"]);
        assert_eq!(resolve_unique_name("a.txt", &existing), "a_1.txt");
    }

    #[test]
    fn test_unique_name_without_extension() {
        assert_eq!(resolve_unique_name("Makefile", &set(&["Makefile"])), "Makefile_1");
    }

    #[test]
    fn test_unique_name_dotfile() {
        assert_eq!(resolve_unique_name(".env", &set(&[".env"])), ".env_1");
    }

    #[test]
    fn test_unique_name_never_in_set() {
        let existing = set(&["x.csv", "x_1.csv", "x_2.csv", "x_3.csv", "y.csv"]);
        for name in ["x.csv", "y.csv", "x_1.csv", "z.csv"] {
            let resolved = resolve_unique_name(name, &existing);
            assert!(!existing.contains(&resolved), "{} resolved to taken {}", name, resolved);
        }
    }

    #[test]
    fn test_unique_name_is_deterministic() {
        let existing = set(&["a.txt", "a_1.txt", "a_3.txt"]);
        let first = resolve_unique_name("a.txt", &existing);
        let second = resolve_unique_name("a.txt", &existing);
        assert_eq!(first, second);
        assert_eq!(first, "a_2.txt");
    }
}

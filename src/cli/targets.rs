//! Unit filter parsing.

/// Merge positional targets and `--only` values into one allow-list.
///
/// Every value may hold a comma-separated list. Names are trimmed, empty
/// entries dropped and duplicates removed keeping first occurrence.
/// `None` means no filter was given, so every unit is built.
pub fn parse_targets(positional: &[String], only: &[String]) -> Option<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for name in positional
        .iter()
        .chain(only)
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    (!names.is_empty()).then_some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_filter() {
        assert_eq!(parse_targets(&[], &[]), None);
        assert_eq!(parse_targets(&strings(&[" , "]), &[]), None);
    }

    #[test]
    fn test_mixed_sources_deduplicated() {
        let targets = parse_targets(
            &strings(&["logic", "sets,graphs"]),
            &strings(&["graphs, algebra", "logic"]),
        );
        assert_eq!(
            targets,
            Some(strings(&["logic", "sets", "graphs", "algebra"]))
        );
    }

    #[test]
    fn test_only_values() {
        assert_eq!(
            parse_targets(&[], &strings(&["a,b,,a"])),
            Some(strings(&["a", "b"]))
        );
    }
}

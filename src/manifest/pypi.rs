use regex::Regex;
use serde::Deserialize;

use crate::error::ManifestParseError;
use crate::models::DependencySet;

/// How a requirement line is split into a package identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementsSyntax {
    /// Only `>` separates name from constraint; `flask==2.0` stays whole.
    Legacy,
    /// The leading distribution name is taken; any operator, extras marker,
    /// environment marker or URL reference after it is dropped. Comment and
    /// pip option lines are skipped.
    #[default]
    Comparators,
}

/// Parse a `requirements.txt` into package identifiers.
pub fn parse(content: &str, syntax: RequirementsSyntax) -> Result<DependencySet, ManifestParseError> {
    match syntax {
        RequirementsSyntax::Legacy => Ok(parse_legacy(content)),
        RequirementsSyntax::Comparators => parse_comparators(content),
    }
}

fn parse_legacy(content: &str) -> DependencySet {
    content
        .lines()
        .filter_map(|line| {
            let name = line.split('>').next().unwrap_or(line).trim();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}

fn parse_comparators(content: &str) -> Result<DependencySet, ManifestParseError> {
    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)")?;
    let mut deps = DependencySet::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            deps.insert(&caps[1]);
        }
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_splits_on_greater_than_only() {
        let deps = parse(
            "numpy>1.0\n\nflask==2.0\n  pandas > 1.5  \n",
            RequirementsSyntax::Legacy,
        )
        .unwrap();
        assert_eq!(
            deps,
            DependencySet::from_iter(["numpy", "flask==2.0", "pandas"])
        );
    }

    #[test]
    fn test_comparators_handles_all_operators() {
        let content = "\
# pinned deps
numpy>1.0
flask==2.0
Django>=3.2,<4
requests[socks]>=2 ; python_version > '3'
six~=1.16
attrs!=21.1
pkg @ https://example.com/pkg.tar.gz
-r base.txt
--index-url https://pypi.org/simple
click  # cli
";
        let deps = parse(content, RequirementsSyntax::Comparators).unwrap();
        assert_eq!(
            deps,
            DependencySet::from_iter([
                "numpy", "flask", "Django", "requests", "six", "attrs", "pkg", "click"
            ])
        );
    }

    #[test]
    fn test_comparators_skips_lines_without_a_leading_name() {
        let content = "/opt/wheels/lib.whl\n  \n@weird\nurllib3==1.26\n";
        let deps = parse(content, RequirementsSyntax::Comparators).unwrap();
        assert_eq!(deps, DependencySet::from_iter(["urllib3"]));
    }

    #[test]
    fn test_default_is_comparators() {
        assert_eq!(RequirementsSyntax::default(), RequirementsSyntax::Comparators);
    }
}

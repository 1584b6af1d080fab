use serde_json::Value;

use crate::error::ManifestParseError;
use crate::models::DependencySet;

/// Parse a `package.json` into the keys of its direct `dependencies` map.
///
/// `devDependencies`, `peerDependencies` and friends are not counted. A
/// manifest without a `dependencies` key has no dependencies.
pub fn parse(content: &str) -> Result<DependencySet, ManifestParseError> {
    let json: Value =
        serde_json::from_str(content).map_err(|e| ManifestParseError::Json(e.to_string()))?;

    let root = json
        .as_object()
        .ok_or_else(|| ManifestParseError::Json("top-level value is not an object".to_string()))?;

    match root.get("dependencies") {
        None => Ok(DependencySet::new()),
        Some(Value::Object(pkgs)) => Ok(pkgs.keys().cloned().collect()),
        Some(_) => Err(ManifestParseError::Json(
            "`dependencies` is not an object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_json() {
        let json = r#"{
  "name": "my-app",
  "dependencies": {
    "express": "^4.18.2",
    "@scope/util": "1.2.3"
  },
  "devDependencies": {
    "jest": "^29.0.0"
  }
}"#;
        let deps = parse(json).unwrap();
        assert_eq!(deps, DependencySet::from_iter(["express", "@scope/util"]));
        assert!(!deps.contains("jest"));
    }

    #[test]
    fn test_single_dependency() {
        let deps = parse(r#"{"dependencies":{"left-pad":"1.0.0"}}"#).unwrap();
        assert_eq!(deps, DependencySet::from_iter(["left-pad"]));
    }

    #[test]
    fn test_missing_dependencies_is_empty() {
        assert!(parse(r#"{"name":"bare"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse(r#"{"dependencies": {"#).is_err());
        assert!(parse(r#"["not", "an", "object"]"#).is_err());
        assert!(parse(r#"{"dependencies": "lodash"}"#).is_err());
    }
}

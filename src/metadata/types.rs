use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Metadata of a single package version as returned by the registry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackageMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Dependency name -> declared version range
    #[serde(deserialize_with = "deserialize_dependencies")]
    pub dependencies: IndexMap<String, String>,
    /// SPDX expression or `{ "type": ..., "url": ... }` object
    pub license: Option<Value>,
    /// Deprecated array form still found in older packages
    pub licenses: Option<Value>,
}

impl PackageMetadata {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            version: Some(version.to_string()),
            ..Self::default()
        }
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.license = Some(Value::String(license.to_string()));
        self
    }

    pub fn with_dependency(mut self, name: &str, range: &str) -> Self {
        self.dependencies
            .insert(name.to_string(), range.to_string());
        self
    }

    /// The declared license, falling back to the legacy `licenses` field.
    /// `Null` when the package declares neither.
    pub fn license_value(&self) -> Value {
        self.license
            .clone()
            .or_else(|| self.licenses.clone())
            .unwrap_or(Value::Null)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependencies {
    Map(IndexMap<String, Value>),
    Other(serde::de::IgnoredAny),
}

/// Older packages publish `dependencies` as `null`, `[]` or with non-string
/// ranges. Anything that is not a name -> range string pair is dropped.
fn deserialize_dependencies<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let dependencies = match RawDependencies::deserialize(deserializer)? {
        RawDependencies::Map(map) => map
            .into_iter()
            .filter_map(|(name, range)| match range {
                Value::String(range) => Some((name, range)),
                _ => None,
            })
            .collect(),
        RawDependencies::Other(_) => IndexMap::new(),
    };
    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn deserializes_registry_payload_ignoring_unknown_fields() {
        let metadata: PackageMetadata = serde_json::from_value(json!({
            "name": "express",
            "version": "4.18.2",
            "license": "MIT",
            "dependencies": {
                "accepts": "~1.3.8",
                "body-parser": "1.20.1"
            },
            "dist": { "tarball": "https://example.invalid/express.tgz" }
        }))
        .unwrap();

        assert_eq!(metadata.name.as_deref(), Some("express"));
        assert_eq!(metadata.version.as_deref(), Some("4.18.2"));
        assert_eq!(metadata.license_value(), json!("MIT"));
        assert_eq!(
            metadata.dependencies.get_index(0),
            Some((&"accepts".to_string(), &"~1.3.8".to_string()))
        );
        assert_eq!(metadata.dependencies.len(), 2);
    }

    #[test]
    fn missing_dependencies_deserialize_as_empty() {
        let metadata: PackageMetadata =
            serde_json::from_value(json!({ "name": "left-pad", "version": "1.3.0" })).unwrap();

        assert!(metadata.dependencies.is_empty());
        assert_eq!(metadata.license_value(), Value::Null);
    }

    #[rstest]
    #[case::null(json!(null))]
    #[case::empty_array(json!([]))]
    #[case::string(json!("none"))]
    fn malformed_dependencies_deserialize_as_empty(#[case] dependencies: Value) {
        let metadata: PackageMetadata = serde_json::from_value(json!({
            "name": "old-pkg",
            "version": "0.0.1",
            "license": "MIT",
            "dependencies": dependencies
        }))
        .unwrap();

        assert!(metadata.dependencies.is_empty());
        assert_eq!(metadata.license_value(), json!("MIT"));
    }

    #[test]
    fn non_string_dependency_ranges_are_skipped() {
        let metadata: PackageMetadata = serde_json::from_str(
            r#"{
                "license": "ISC",
                "dependencies": {
                    "zeta": "^1.0.0",
                    "nested": { "version": "1.0.0" },
                    "alpha": "^2.0.0",
                    "numeric": 1
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            metadata.dependencies.into_iter().collect::<Vec<_>>(),
            vec![
                ("zeta".to_string(), "^1.0.0".to_string()),
                ("alpha".to_string(), "^2.0.0".to_string()),
            ]
        );
    }

    #[test]
    fn license_value_falls_back_to_legacy_licenses_array() {
        let metadata: PackageMetadata = serde_json::from_value(json!({
            "licenses": [{ "type": "MIT", "url": "https://opensource.org/licenses/MIT" }]
        }))
        .unwrap();

        assert_eq!(
            metadata.license_value(),
            json!([{ "type": "MIT", "url": "https://opensource.org/licenses/MIT" }])
        );
    }

    #[test]
    fn license_value_keeps_object_form() {
        let metadata: PackageMetadata = serde_json::from_value(json!({
            "license": { "type": "ISC", "url": "https://opensource.org/licenses/ISC" },
            "licenses": [{ "type": "MIT" }]
        }))
        .unwrap();

        assert_eq!(
            metadata.license_value(),
            json!({ "type": "ISC", "url": "https://opensource.org/licenses/ISC" })
        );
    }
}

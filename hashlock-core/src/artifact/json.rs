//! JSON artifact for toolchains that read data rather than source

use super::{parse_error, ArtifactFormat, REGENERATE_COMMAND};
use crate::error::Result;
use crate::hasher::Digest;
use crate::manifest::Manifest;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Current JSON artifact schema version
pub const JSON_ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonArtifact {
    #[serde(rename = "_comment")]
    comment: String,
    generator: String,
    version: u32,
    #[serde(deserialize_with = "deserialize_unique_entries")]
    files: BTreeMap<String, Digest>,
}

/// Like the default map deserializer, but a repeated path is an error
/// instead of silently keeping the last value
fn deserialize_unique_entries<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Digest>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueEntries;

    impl<'de> Visitor<'de> for UniqueEntries {
        type Value = BTreeMap<String, Digest>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from protected path to SHA-256 digest")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = BTreeMap::new();
            while let Some((path, digest)) = access.next_entry::<String, Digest>()? {
                if entries.contains_key(&path) {
                    return Err(de::Error::custom(format!(
                        "duplicate entry for '{path}' in artifact"
                    )));
                }
                entries.insert(path, digest);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(UniqueEntries)
}

impl ArtifactFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&self, manifest: &Manifest) -> Result<String> {
        let artifact = JsonArtifact {
            comment: format!("AUTO-GENERATED -- Do not edit manually! Run: {REGENERATE_COMMAND}"),
            generator: "hashlock".to_string(),
            version: JSON_ARTIFACT_VERSION,
            files: manifest
                .iter()
                .map(|(path, digest)| (path.clone(), digest.clone()))
                .collect(),
        };

        let mut rendered = serde_json::to_string_pretty(&artifact)?;
        rendered.push('\n');
        Ok(rendered)
    }

    fn parse(&self, text: &str) -> Result<Manifest> {
        let artifact: JsonArtifact =
            serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;

        if artifact.version != JSON_ARTIFACT_VERSION {
            return Err(parse_error(format!(
                "unsupported artifact version {} (expected {})",
                artifact.version, JSON_ARTIFACT_VERSION
            )));
        }

        let mut manifest = Manifest::new();
        for (path, digest) in artifact.files {
            manifest.insert(path, digest)?;
        }
        Ok(manifest)
    }
}

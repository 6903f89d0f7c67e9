//! Typed layer metadata
//!
//! Each layer persists a `<layers>/<name>.toml` file with a `[types]` table
//! (how the layer is exposed) and a `[metadata]` table (provenance). The
//! metadata table is a typed record per installer so the fields the build
//! cache depends on are checked at compile time.

use serde::{Deserialize, Serialize};

/// How the build pipeline should expose a layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTypes {
    /// Available to the launched application image
    pub launch: bool,
    /// Available to subsequent build steps
    pub build: bool,
    /// Restored on the next build
    pub cache: bool,
}

impl LayerTypes {
    pub fn all() -> Self {
        Self {
            launch: true,
            build: true,
            cache: true,
        }
    }
}

/// On-disk shape of `<layers>/<name>.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord<M> {
    #[serde(default)]
    pub types: LayerTypes,
    pub metadata: M,
}

/// Provenance of a compiled binary, consulted by the build cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Cache key of the inputs that produced the binary
    pub build_hash: String,
    pub xcaddy_version: String,
    /// Sorted plugin list, comma-joined
    pub plugins: String,
    /// Self-reported version of the produced binary
    pub caddy_version: String,
    pub buildpack_version: String,
    /// Where the builder tool was downloaded from
    pub uri: String,
}

/// Provenance of a downloaded archive or binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadMetadata {
    /// Hex SHA-256 of the downloaded bytes (recorded, not verified)
    pub checksum: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    pub os: String,
    pub arch: String,
    pub buildpack_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetadata {
    /// Command from the Procfile `dev:` line, empty when absent
    pub dev_command: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CADDY_RECORD: &str = r#"
[types]
launch = true
build = true
cache = true

[metadata]
build_hash = "4f1c"
xcaddy_version = "v0.4.5"
plugins = "github.com/ggicci/caddy-jwt"
caddy_version = "v2.8.4 h1:abc"
buildpack_version = "0.3.0"
uri = "https://github.com/caddyserver/xcaddy/releases/download/v0.4.5/xcaddy_0.4.5_linux_amd64.tar.gz"
"#;

    #[test]
    fn parse_build_record() {
        let record: LayerRecord<BuildMetadata> = toml::from_str(CADDY_RECORD).unwrap();
        assert_eq!(record.types, LayerTypes::all());
        assert_eq!(record.metadata.build_hash, "4f1c");
        assert_eq!(record.metadata.caddy_version, "v2.8.4 h1:abc");
    }

    #[test]
    fn missing_required_fields_errors() {
        let partial = r#"
[metadata]
build_hash = "4f1c"
"#;
        assert!(toml::from_str::<LayerRecord<BuildMetadata>>(partial).is_err());
    }

    #[test]
    fn types_default_to_false() {
        let record: LayerRecord<RuntimeMetadata> =
            toml::from_str("[metadata]\ndev_command = \"npm run dev\"\n").unwrap();
        assert_eq!(record.types, LayerTypes::default());
        assert_eq!(record.metadata.dev_command, "npm run dev");
    }

    #[test]
    fn download_metadata_omits_absent_optionals() {
        let record = LayerRecord {
            types: LayerTypes::all(),
            metadata: DownloadMetadata {
                checksum: "abc".to_string(),
                uri: "https://pkgx.sh/Linux/x86_64.tgz".to_string(),
                version: None,
                asset: None,
                os: "Linux".to_string(),
                arch: "x86_64".to_string(),
                buildpack_version: "0.3.0".to_string(),
            },
        };
        let text = toml::to_string_pretty(&record).unwrap();
        assert!(text.contains("checksum = \"abc\""));
        assert!(!text.contains("version = \"\""));
        assert!(!text.contains("asset"));
    }
}

//! Request path parsing.

use crate::error::{Error, Result};
use crate::resolver::escape;

/// The single fixed path of the checksum-database endpoint. Checksum
/// endorsements are not served here; clients are pushed back to the
/// public database with a 404.
const CHECKSUM_PROBE_PATH: &str = "sumdb/sum.golang.org/supported";

/// Which artifact of a `(module, version)` record a request names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Info,
    Mod,
    Zip,
}

impl ArtifactKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Info => ".info",
            ArtifactKind::Mod => ".mod",
            ArtifactKind::Zip => ".zip",
        }
    }
}

/// The parsed form of a request path. Module and version segments are
/// kept in their case-escaped request form, validated during parsing;
/// consumers unescape them before touching the store or the VCS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    VersionList {
        module: String,
    },
    Latest {
        module: String,
    },
    Artifact {
        module: String,
        version: String,
        kind: ArtifactKind,
    },
    ChecksumProbe,
}

/// Parse a request path (leading `/` optional) into a [`ResourceId`].
pub fn parse(path: &str) -> Result<ResourceId> {
    let query = path.strip_prefix('/').unwrap_or(path);

    if query == CHECKSUM_PROBE_PATH {
        return Ok(ResourceId::ChecksumProbe);
    }

    if let Some(module) = query.strip_suffix("/@latest") {
        escape::unescape_path(module)?;
        return Ok(ResourceId::Latest {
            module: module.to_string(),
        });
    }

    if let Some(module) = query.strip_suffix("/@v/list") {
        escape::unescape_path(module)?;
        return Ok(ResourceId::VersionList {
            module: module.to_string(),
        });
    }

    let parts: Vec<&str> = query.split("/@v/").collect();
    if parts.len() != 2 {
        return Err(Error::InvalidResource(format!("query {query}")));
    }
    let (module, resource) = (parts[0], parts[1]);
    escape::unescape_path(module)?;

    for kind in [ArtifactKind::Info, ArtifactKind::Mod, ArtifactKind::Zip] {
        if let Some(version) = resource.strip_suffix(kind.suffix()) {
            escape::unescape_version(version)?;
            return Ok(ResourceId::Artifact {
                module: module.to_string(),
                version: version.to_string(),
                kind,
            });
        }
    }

    Err(Error::InvalidResource(format!("query {query}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_the_four_shapes() {
        assert_eq!(
            parse("/example.com/m/@latest").unwrap(),
            ResourceId::Latest {
                module: "example.com/m".to_string()
            }
        );
        assert_eq!(
            parse("/example.com/m/@v/list").unwrap(),
            ResourceId::VersionList {
                module: "example.com/m".to_string()
            }
        );
        assert_eq!(
            parse("/example.com/m/@v/v1.2.3.zip").unwrap(),
            ResourceId::Artifact {
                module: "example.com/m".to_string(),
                version: "v1.2.3".to_string(),
                kind: ArtifactKind::Zip,
            }
        );
        assert_eq!(
            parse("/sumdb/sum.golang.org/supported").unwrap(),
            ResourceId::ChecksumProbe
        );
    }

    #[test]
    fn artifact_kind_follows_the_suffix() {
        for (suffix, kind) in [
            (".info", ArtifactKind::Info),
            (".mod", ArtifactKind::Mod),
            (".zip", ArtifactKind::Zip),
        ] {
            let parsed = parse(&format!("/example.com/m/@v/v1.0.0{suffix}")).unwrap();
            assert_eq!(
                parsed,
                ResourceId::Artifact {
                    module: "example.com/m".to_string(),
                    version: "v1.0.0".to_string(),
                    kind,
                }
            );
        }
    }

    #[test]
    fn malformed_queries_are_invalid() {
        for query in [
            "/",
            "github.com/@v",
            "github.com/slk/@v",
            "github.com/x/module1/v1.0.0",
            "github.com/x/module2/@latest/asf",
            "github.com/x/module3/@v/@latest",
            "github.com/x/module4/@v/@latest/asf",
            "a/@v/b/@v/v1.0.0.info",
            "example.com/m/@v/",
            "example.com/m/@v/.mod",
        ] {
            assert!(parse(query).is_err(), "{query} should not parse");
        }
    }

    #[test]
    fn uppercase_segments_are_rejected() {
        assert!(parse("/github.com/Owner/m/@latest").is_err());
        assert!(parse("/github.com/owner/m/@v/V1.0.0.info").is_err());
    }

    #[test]
    fn parsing_then_reformatting_is_lossless() {
        for (module, version, kind) in [
            ("example.com/m", "v1.0.0", ArtifactKind::Info),
            ("github.com/owner/mod", "v0.1.0-rc1", ArtifactKind::Zip),
        ] {
            let original = format!("/{module}/@v/{version}{}", kind.suffix());
            match parse(&original).unwrap() {
                ResourceId::Artifact {
                    module: m,
                    version: v,
                    kind: k,
                } => {
                    assert_eq!(format!("/{m}/@v/{v}{}", k.suffix()), original);
                }
                other => panic!("unexpected parse result {other:?}"),
            }
        }
    }
}

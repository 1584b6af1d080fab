//! Manifest parsing: raw manifest bytes in, [`DependencySet`] out.
//!
//! - [`maven`]: `pom.xml` build descriptors.
//! - [`npm`]: `package.json` package manifests.
//! - [`pypi`]: `requirements.txt` pinned requirement lists.

use crate::error::ManifestParseError;
use crate::models::{DependencySet, Ecosystem};

pub mod maven;
pub mod npm;
pub mod pypi;

pub use pypi::RequirementsSyntax;

/// The closed set of manifest formats, one per ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    BuildDescriptor,
    PackageManifest,
    PinnedRequirements(RequirementsSyntax),
}

impl ManifestFormat {
    /// Select the format tracked for `ecosystem`.
    ///
    /// `syntax` only matters for requirement lists.
    pub fn for_ecosystem(ecosystem: Ecosystem, syntax: RequirementsSyntax) -> Self {
        match ecosystem {
            Ecosystem::Maven => ManifestFormat::BuildDescriptor,
            Ecosystem::Npm => ManifestFormat::PackageManifest,
            Ecosystem::Pypi => ManifestFormat::PinnedRequirements(syntax),
        }
    }

    /// Parse one manifest snapshot. Never touches the file it came from.
    pub fn parse(&self, content: &[u8]) -> Result<DependencySet, ManifestParseError> {
        let text = std::str::from_utf8(content)?;
        match self {
            ManifestFormat::BuildDescriptor => maven::parse(text),
            ManifestFormat::PackageManifest => npm::parse(text),
            ManifestFormat::PinnedRequirements(syntax) => pypi::parse(text, *syntax),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_ecosystem() {
        let npm = ManifestFormat::for_ecosystem(Ecosystem::Npm, RequirementsSyntax::default());
        let deps = npm
            .parse(br#"{"dependencies":{"left-pad":"1.0.0"}}"#)
            .unwrap();
        assert_eq!(deps, DependencySet::from_iter(["left-pad"]));

        let pypi = ManifestFormat::for_ecosystem(Ecosystem::Pypi, RequirementsSyntax::Legacy);
        assert_eq!(
            pypi,
            ManifestFormat::PinnedRequirements(RequirementsSyntax::Legacy)
        );
        assert!(pypi.parse(b"numpy>1.0\n").unwrap().contains("numpy"));
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let format = ManifestFormat::for_ecosystem(Ecosystem::Pypi, RequirementsSyntax::default());
        let err = format.parse(&[0x66, 0x6f, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ManifestParseError::Encoding(_)));
    }
}

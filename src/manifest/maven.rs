use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::ManifestParseError;
use crate::models::DependencySet;

const POM_NAMESPACE: &[u8] = b"http://maven.apache.org/POM/4.0.0";

/// Parse a `pom.xml` into the set of declared artifact ids.
///
/// Every `<artifactId>` that is a direct child of a `<dependency>` counts,
/// wherever that dependency sits (`<dependencies>`, `<dependencyManagement>`,
/// plugin dependencies). Both elements must be in the POM namespace or carry
/// no namespace at all.
pub fn parse(content: &str) -> Result<DependencySet, ManifestParseError> {
    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut deps = DependencySet::new();
    // Local names of the open elements; `None` marks a foreign namespace.
    let mut open: Vec<Option<String>> = Vec::new();
    let mut seen_root = false;
    // Text of the `<artifactId>` being read; it may arrive in several pieces.
    let mut artifact_id = String::new();

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(ref e))) => {
                seen_root = true;
                let name = in_pom_namespace(&ns)
                    .then(|| String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                open.push(name);
            }
            Ok((_, Event::Empty(_))) => {
                seen_root = true;
            }
            Ok((_, Event::End(_))) => {
                if inside_artifact_id(&open) {
                    let id = artifact_id.trim();
                    if !id.is_empty() {
                        deps.insert(id);
                    }
                    artifact_id.clear();
                }
                open.pop();
            }
            Ok((_, Event::Text(ref e))) => {
                if inside_artifact_id(&open) {
                    let text = e
                        .unescape()
                        .map_err(|err| ManifestParseError::Xml(err.to_string()))?;
                    artifact_id.push_str(&text);
                }
            }
            Ok((_, Event::CData(ref e))) => {
                if inside_artifact_id(&open) {
                    artifact_id.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => return Err(ManifestParseError::Xml(e.to_string())),
            _ => {}
        }
    }

    if !seen_root {
        return Err(ManifestParseError::Xml("document has no root element".to_string()));
    }
    if let Some(Some(unclosed)) = open.last() {
        return Err(ManifestParseError::Xml(format!(
            "unexpected end of document inside <{}>",
            unclosed
        )));
    }
    if !open.is_empty() {
        return Err(ManifestParseError::Xml("unexpected end of document".to_string()));
    }

    Ok(deps)
}

fn in_pom_namespace(ns: &ResolveResult) -> bool {
    match ns {
        ResolveResult::Unbound => true,
        ResolveResult::Bound(Namespace(uri)) => *uri == POM_NAMESPACE,
        ResolveResult::Unknown(_) => false,
    }
}

fn inside_artifact_id(open: &[Option<String>]) -> bool {
    match open {
        [.., Some(parent), Some(current)] => parent == "dependency" && current == "artifactId",
        _ => false,
    }
}

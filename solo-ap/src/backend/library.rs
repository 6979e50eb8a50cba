//! Track id → file resolution

use crate::error::{Error, Result};
use solo_common::TrackId;
use std::path::{Component, Path, PathBuf};

/// Folder of playable files that track ids are resolved against
///
/// Accepts library-relative paths (`audio/intro.mp3`), site-absolute paths
/// (`/audio/intro.mp3`) and URLs (`https://host/audio/intro.mp3`); the
/// scheme, host, query and fragment are ignored.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a track id to an existing file under the root
    pub fn resolve(&self, track: &TrackId) -> Result<PathBuf> {
        let relative = relative_path(track.as_str())?;
        let path = self.root.join(relative);

        if !path.is_file() {
            return Err(Error::TrackNotFound(format!(
                "{} (looked in {})",
                track,
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Library-relative path named by a track id
fn relative_path(id: &str) -> Result<PathBuf> {
    let mut rest = id.trim();

    if let Some((_, after_scheme)) = rest.split_once("://") {
        // Drop the authority; an id that is only a host names nothing
        rest = after_scheme.find('/').map_or("", |i| &after_scheme[i..]);
    }
    if let Some(i) = rest.find(['?', '#']) {
        rest = &rest[..i];
    }

    let mut relative = PathBuf::new();
    for component in Path::new(rest).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(Error::InvalidTrack(format!(
                    "'{}' escapes the library root",
                    id
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(Error::InvalidTrack(format!("'{}' does not name a file", id)));
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_forms() {
        assert_eq!(relative_path("song1.mp3").unwrap(), PathBuf::from("song1.mp3"));
        assert_eq!(
            relative_path("/audio/song1.mp3").unwrap(),
            PathBuf::from("audio/song1.mp3")
        );
        assert_eq!(
            relative_path("https://example.org/audio/song1.mp3?v=2#t=10").unwrap(),
            PathBuf::from("audio/song1.mp3")
        );
        assert_eq!(
            relative_path("./audio/./song1.mp3").unwrap(),
            PathBuf::from("audio/song1.mp3")
        );
    }

    #[test]
    fn test_relative_path_rejects_traversal_and_empty() {
        assert!(matches!(relative_path("../etc/passwd"), Err(Error::InvalidTrack(_))));
        assert!(matches!(relative_path("audio/../../x.mp3"), Err(Error::InvalidTrack(_))));
        assert!(matches!(relative_path(""), Err(Error::InvalidTrack(_))));
        assert!(matches!(relative_path("/"), Err(Error::InvalidTrack(_))));
        assert!(matches!(relative_path("https://example.org"), Err(Error::InvalidTrack(_))));
    }

    #[test]
    fn test_resolve_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("audio")).unwrap();
        std::fs::write(dir.path().join("audio/song1.mp3"), b"not really audio").unwrap();

        let library = Library::new(dir.path());

        let path = library.resolve(&TrackId::from("/audio/song1.mp3")).unwrap();
        assert_eq!(path, dir.path().join("audio/song1.mp3"));

        assert!(matches!(
            library.resolve(&TrackId::from("/audio/song2.mp3")),
            Err(Error::TrackNotFound(_))
        ));
        // Directories are not playable
        assert!(matches!(
            library.resolve(&TrackId::from("/audio")),
            Err(Error::TrackNotFound(_))
        ));
    }
}

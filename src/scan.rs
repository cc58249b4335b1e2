use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// The game only loads mod folders whose marker carries this extension.
pub const ACTIVE_MARKER_EXT: &str = "modfile";
/// Renaming the marker to this extension parks the mod without moving it.
pub const INACTIVE_MARKER_EXT: &str = "mod";

const SKELETON_EXTS: &[&str] = &["skel", "json"];
const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];
const HIDDEN_MARKER: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Active,
    Inactive,
    /// No marker file at all. Listed, never acted on.
    Missing,
}

impl Activation {
    pub fn label(self) -> &'static str {
        match self {
            Activation::Active => "Active",
            Activation::Inactive => "Inactive",
            Activation::Missing => "No marker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Animation,
    Image,
    None,
}

#[derive(Debug, Clone)]
pub struct ModFolder {
    pub author: String,
    pub name: String,
    pub path: PathBuf,
    pub marker: Option<PathBuf>,
    pub activation: Activation,
    pub kind: ContentKind,
    /// Lowercased file names from the recursive walk, sorted. The resolver
    /// works from these alone.
    pub file_names: Vec<String>,
    /// First skeleton file, else first image. What the preview action hands
    /// to the viewer or the opener.
    pub preview: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct Scan {
    pub folders: Vec<ModFolder>,
    pub warnings: Vec<String>,
}

/// Enumerates `<root>/<author>/<mod>` and classifies every mod folder.
/// A missing root yields an empty scan; an unreadable folder is reported
/// as unclassifiable instead of aborting the rest.
pub fn scan_mods(root: &Path) -> Scan {
    let mut scan = Scan::default();
    let Ok(authors) = fs::read_dir(root) else {
        return scan;
    };

    let mut author_dirs: Vec<PathBuf> = authors
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && !is_hidden(path))
        .collect();
    author_dirs.sort();

    for author_dir in author_dirs {
        let author = file_name_string(&author_dir);
        let Ok(mods) = fs::read_dir(&author_dir) else {
            scan.warnings
                .push(format!("Cannot read author folder {}", author_dir.display()));
            continue;
        };

        let mut mod_dirs: Vec<PathBuf> = mods
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && !is_hidden(path))
            .collect();
        mod_dirs.sort();

        for mod_dir in mod_dirs {
            let folder = classify_folder(&author, &mod_dir, &mut scan.warnings);
            if folder.activation == Activation::Missing && folder.marker.is_none() {
                scan.warnings.push(format!(
                    "No activation marker in {}/{}",
                    folder.author, folder.name
                ));
            }
            scan.folders.push(folder);
        }
    }

    scan
}

fn classify_folder(author: &str, path: &Path, warnings: &mut Vec<String>) -> ModFolder {
    let name = file_name_string(path);
    let mut folder = ModFolder {
        author: author.to_string(),
        name,
        path: path.to_path_buf(),
        marker: None,
        activation: Activation::Missing,
        kind: ContentKind::None,
        file_names: Vec::new(),
        preview: None,
    };

    let mut first_skeleton: Option<PathBuf> = None;
    let mut first_image: Option<PathBuf> = None;

    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warnings.push(format!(
                    "Cannot classify {author}/{}: {err}",
                    folder.name
                ));
                folder.marker = None;
                folder.activation = Activation::Missing;
                folder.kind = ContentKind::None;
                folder.file_names.clear();
                folder.preview = None;
                return folder;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_lowercase();
        let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

        if extension == ACTIVE_MARKER_EXT || extension == INACTIVE_MARKER_EXT {
            // At most one marker decides state; first in sorted order wins.
            if folder.marker.is_none() {
                folder.marker = Some(entry.path().to_path_buf());
                folder.activation = if extension == ACTIVE_MARKER_EXT {
                    Activation::Active
                } else {
                    Activation::Inactive
                };
            }
        } else if SKELETON_EXTS.contains(&extension) {
            if first_skeleton.is_none() {
                first_skeleton = Some(entry.path().to_path_buf());
            }
        } else if IMAGE_EXTS.contains(&extension) {
            if first_image.is_none() {
                first_image = Some(entry.path().to_path_buf());
            }
        }

        folder.file_names.push(file_name);
    }

    folder.file_names.sort();
    if first_skeleton.is_some() {
        folder.kind = ContentKind::Animation;
        folder.preview = first_skeleton;
    } else if first_image.is_some() {
        folder.kind = ContentKind::Image;
        folder.preview = first_image;
    }

    folder
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(HIDDEN_MARKER))
        .unwrap_or(false)
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn missing_root_yields_empty_scan() {
        let dir = tempfile::tempdir().unwrap();
        let scan = scan_mods(&dir.path().join("nowhere"));
        assert!(scan.folders.is_empty());
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn classifies_animation_image_and_none() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("linr/anim/cutscene_char060403.skel"));
        touch(&root.join("linr/anim/celia.modfile"));
        touch(&root.join("linr/pic/portrait.png"));
        touch(&root.join("linr/pic/pic.mod"));
        touch(&root.join("linr/other/readme.txt"));
        touch(&root.join("linr/other/other.mod"));

        let scan = scan_mods(root);
        assert_eq!(scan.folders.len(), 3);
        let by_name = |name: &str| {
            scan.folders
                .iter()
                .find(|folder| folder.name == name)
                .unwrap()
        };
        assert_eq!(by_name("anim").kind, ContentKind::Animation);
        assert_eq!(by_name("anim").activation, Activation::Active);
        assert_eq!(by_name("pic").kind, ContentKind::Image);
        assert_eq!(by_name("pic").activation, Activation::Inactive);
        assert_eq!(by_name("other").kind, ContentKind::None);
    }

    #[test]
    fn skeleton_wins_over_image_for_preview() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/m/z_char000101.skel"));
        touch(&root.join("a/m/a_preview.png"));
        touch(&root.join("a/m/m.modfile"));

        let scan = scan_mods(root);
        let folder = &scan.folders[0];
        assert_eq!(folder.kind, ContentKind::Animation);
        assert!(folder
            .preview
            .as_ref()
            .unwrap()
            .to_string_lossy()
            .ends_with(".skel"));
    }

    #[test]
    fn hidden_directories_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join(".git/skip/file.mod"));
        touch(&root.join("author/.cache/file.mod"));
        touch(&root.join("author/real/real.modfile"));

        let scan = scan_mods(root);
        assert_eq!(scan.folders.len(), 1);
        assert_eq!(scan.folders[0].author, "author");
        assert_eq!(scan.folders[0].name, "real");
    }

    #[test]
    fn missing_marker_is_listed_and_warned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("author/bare/asset.png"));

        let scan = scan_mods(root);
        assert_eq!(scan.folders.len(), 1);
        assert_eq!(scan.folders[0].activation, Activation::Missing);
        assert!(scan.folders[0].marker.is_none());
        assert!(scan
            .warnings
            .iter()
            .any(|warning| warning.contains("author/bare")));
    }

    #[test]
    fn files_in_nested_subfolders_are_seen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("author/deep/deep.modfile"));
        touch(&root.join("author/deep/sub/inner/char123456.skel"));

        let scan = scan_mods(root);
        let folder = &scan.folders[0];
        assert_eq!(folder.kind, ContentKind::Animation);
        assert!(folder
            .file_names
            .iter()
            .any(|name| name == "char123456.skel"));
    }

    #[test]
    fn folders_sort_by_author_then_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("beta/one/one.mod"));
        touch(&root.join("alpha/two/two.mod"));
        touch(&root.join("alpha/one/one.mod"));

        let scan = scan_mods(root);
        let order: Vec<(String, String)> = scan
            .folders
            .iter()
            .map(|folder| (folder.author.clone(), folder.name.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha".to_string(), "one".to_string()),
                ("alpha".to_string(), "two".to_string()),
                ("beta".to_string(), "one".to_string()),
            ]
        );
    }
}

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;

pub fn hide_cursor() {
    print!("\x1B[?25l");
    io::stdout().flush().unwrap();
}

pub fn show_cursor() {
    print!("\x1B[?25h");
    io::stdout().flush().unwrap();
}

/// Drops directories that are nested inside another entry in the list, so
/// the scan never visits the same file twice.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        let mut should_add = true;

        for res_dir in result.clone() {
            let res_dir_path = Path::new(&res_dir);

            if dir_path.starts_with(res_dir_path) {
                should_add = false;
                break;
            }

            if res_dir_path.starts_with(dir_path) {
                result.retain(|x| *x != res_dir);
                break;
            }
        }

        if should_add {
            result.push(dir);
        }
    }

    result
}

/// Bottom-up sweep deleting directories left empty below `root` after a
/// run. `root` itself and skip-listed names are left alone.
pub fn remove_empty_dirs(root: &Path, skip_dirs: &[String]) -> usize {
    let mut removed = 0usize;

    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if skip_dirs.iter().any(|skip| skip == &name) {
            continue;
        }
        let is_empty = fs::read_dir(entry.path())
            .map(|mut contents| contents.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(entry.path()).is_ok() {
            removed += 1;
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn nested_directories_collapse_to_parent() {
        let dirs = vec![
            "/photos".to_string(),
            "/photos/2023".to_string(),
            "/videos".to_string(),
        ];
        assert_eq!(
            non_overlapping_directories(dirs),
            vec!["/photos".to_string(), "/videos".to_string()]
        );
    }

    #[test]
    fn parent_arriving_later_replaces_child() {
        let dirs = vec!["/photos/2023".to_string(), "/photos".to_string()];
        assert_eq!(
            non_overlapping_directories(dirs),
            vec!["/photos".to_string()]
        );
    }

    #[test]
    fn empty_dirs_removed_bottom_up() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("a/b/c")).unwrap();
        fs::create_dir(root.path().join("kept")).unwrap();
        fs::write(root.path().join("kept/file.jpg"), b"x").unwrap();

        let removed = remove_empty_dirs(root.path(), &[]);
        assert_eq!(removed, 3);
        assert!(!root.path().join("a").exists());
        assert!(root.path().join("kept/file.jpg").exists());
        assert!(root.path().exists());
    }

    #[test]
    fn skip_dirs_survive_the_sweep() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join(".cache")).unwrap();
        let removed = remove_empty_dirs(root.path(), &[".cache".to_string()]);
        assert_eq!(removed, 0);
        assert!(root.path().join(".cache").exists());
    }
}

#![forbid(unsafe_code)]

use std::path::Path;

use crate::pak::error::{PakError, PakResult};

/// Entry name for a file found under `input_root`, relative to it with forward slashes.
pub fn normalize_rel_path(input_root: &Path, file_path: &Path) -> PakResult<String> {
    let rel = file_path.strip_prefix(input_root).map_err(|_| {
        PakError::Argument(format!(
            "path is outside input dir: {}",
            file_path.to_string_lossy()
        ))
    })?;

    let out = join_components(rel);
    if out.is_empty() {
        return Err(PakError::Argument("empty relative path".into()));
    }
    Ok(out)
}

/// Entry name for a path given on the command line: forward slashes, no leading `./` or `/`.
pub fn entry_name(path: &Path) -> PakResult<String> {
    let out = join_components(path);
    if out.is_empty() {
        return Err(PakError::Argument(format!(
            "no entry name in path {}",
            path.to_string_lossy()
        )));
    }
    Ok(out)
}

pub fn prefixed(prefix: &str, rel: &str) -> String {
    if prefix.is_empty() {
        return rel.to_string();
    }
    let mut p = prefix.replace('\\', "/");
    if !p.ends_with('/') {
        p.push('/');
    }
    let r = rel.trim_start_matches('/');
    format!("{p}{r}")
}

fn join_components(path: &Path) -> String {
    use std::path::Component;

    let mut out = String::new();
    for comp in path.components() {
        let part = match comp {
            Component::Normal(s) => s.to_string_lossy(),
            Component::ParentDir => "..".into(),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => continue,
        };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&part);
    }
    out.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_use_forward_slashes() {
        let root = Path::new("assets");
        let file = Path::new("assets").join("tex").join("a.png");
        assert_eq!(normalize_rel_path(root, &file).unwrap(), "tex/a.png");
    }

    #[test]
    fn cli_paths_drop_current_dir() {
        assert_eq!(entry_name(Path::new("./data/a.txt")).unwrap(), "data/a.txt");
        assert!(entry_name(Path::new(".")).is_err());
    }

    #[test]
    fn prefix_joins_once() {
        assert_eq!(prefixed("assets", "a.png"), "assets/a.png");
        assert_eq!(prefixed("assets/", "/a.png"), "assets/a.png");
        assert_eq!(prefixed("", "a.png"), "a.png");
    }
}

//! Make-style dependency file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Render a depfile making `target` depend on every path in `deps`.
///
/// Directories are listed too: a probe that found nothing records the
/// nearest existing directory, so adding the file later triggers a rebuild.
pub fn render_depfile(target: &Path, deps: &BTreeSet<PathBuf>) -> String {
    let mut out = format!("{}: \\\n", escape(target));
    for dep in deps {
        out.push_str("    ");
        out.push_str(&escape(dep));
        out.push_str(" \\\n");
    }
    out.push('\n');
    out
}

fn escape(path: &Path) -> String {
    path.display().to_string().replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render() {
        let deps: BTreeSet<PathBuf> = ["src/data", "src/assets/grass.png", "src/data/a b.od"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let text = render_depfile(Path::new("out/stamp"), &deps);
        assert_eq!(
            text,
            "out/stamp: \\\n    src/assets/grass.png \\\n    src/data \\\n    src/data/a\\ b.od \\\n\n"
        );
    }

    #[test]
    fn test_no_deps() {
        assert_eq!(render_depfile(Path::new("stamp"), &BTreeSet::new()), "stamp: \\\n\n");
    }
}

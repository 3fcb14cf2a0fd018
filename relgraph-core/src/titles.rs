use crate::error::{CrawlError, Result};
use crate::forest::ForestLog;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write every record title of `forest`, one per line in log order, to
/// `<dir>/<log file name>`. Returns the output path and the title count.
pub fn extract_titles(forest: &ForestLog, dir: &Path) -> Result<(PathBuf, usize)> {
    let file_name = forest
        .path()
        .file_name()
        .ok_or_else(|| CrawlError::InvalidOptions(format!("{} is not a file", forest.path().display())))?;

    fs::create_dir_all(dir).map_err(|e| CrawlError::io(dir, e))?;
    let out_path = dir.join(file_name);
    let file = File::create(&out_path).map_err(|e| CrawlError::io(&out_path, e))?;
    let mut out = BufWriter::new(file);

    let mut count = 0;
    for tree in forest.iter()? {
        let tree = tree?;
        for record in tree.records() {
            // One title per line, whatever the platform put in it.
            let title = record.title.replace(['\r', '\n'], " ");
            writeln!(out, "{}", title).map_err(|e| CrawlError::io(&out_path, e))?;
            count += 1;
        }
    }
    out.flush().map_err(|e| CrawlError::io(&out_path, e))?;

    info!("Extracted {} titles: {}", count, out_path.display());
    Ok((out_path, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, RelationRecord, Tree};
    use tempfile::TempDir;

    #[test]
    fn test_titles_in_log_order() {
        let dir = TempDir::new().unwrap();
        let forest = ForestLog::new(dir.path().join("data").join("v0.log"));
        forest
            .create(&Tree::new(vec![
                Layer::from(vec![RelationRecord::root("v0", "First", "UC0")]),
                Layer::from(vec![RelationRecord {
                    item: "v1".to_string(),
                    parent: Some("v0".to_string()),
                    title: "Second\nline".to_string(),
                    channel: "UC1".to_string(),
                }]),
            ]))
            .unwrap();
        forest
            .append(&Tree::new(vec![Layer::from(vec![RelationRecord::root("v1", "Third", "UC1")])]))
            .unwrap();

        let (path, count) = extract_titles(&forest, &dir.path().join("titles")).unwrap();
        assert_eq!(count, 3);
        assert!(path.ends_with("titles/v0.log"));
        assert_eq!(fs::read_to_string(path).unwrap(), "First\nSecond line\nThird\n");
    }
}

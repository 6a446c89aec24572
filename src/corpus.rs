use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// .txt files directly inside folder, in file name order
pub fn read_corpus_dir<P: AsRef<Path>>(folder: P) -> Result<Vec<String>> {

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(folder.as_ref())? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "txt") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut texts = Vec::with_capacity(paths.len());
    for path in &paths {
        debug!("reading {:?}", path);
        texts.push(fs::read_to_string(path)?);
    }
    Ok(texts)
}

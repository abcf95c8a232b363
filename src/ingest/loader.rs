//! 输入文件发现
//!
//! 目录递归扫描 `*.csv`，按路径排序，保证串行与并行导入看到相同的文件顺序。

use std::fs;
use std::path::{Path, PathBuf};

use crate::{EngineError, Result};

/// 收集输入文件
///
/// - 路径是文件：原样返回
/// - 路径是目录：递归收集全部 `.csv` (大小写不敏感)
pub fn collect_csv_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(EngineError::PathNotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    walk(path, &mut files)?;
    files.sort();

    if files.is_empty() {
        return Err(EngineError::NoInputFiles(path.to_path_buf()));
    }
    log::debug!("[Ingest] found {} csv files under {}", files.len(), path.display());
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source| EngineError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if is_csv(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
}

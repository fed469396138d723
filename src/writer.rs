use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Writes a two-column file: a header row, then one `id,label` row per identifier.
///
/// The parent directory is created if it does not exist. Nothing is retried; the
/// first failure is returned.
pub fn write_predictions<P, I, L>(
    path: P,
    id_header: &str,
    label_header: &str,
    ids: &[I],
    labels: &[L],
) -> Result<()>
where
    P: AsRef<Path>,
    I: AsRef<str>,
    L: AsRef<str>,
{
    let path = path.as_ref();
    if ids.len() != labels.len() {
        return Err(Error::LengthMismatch {
            ids: ids.len(),
            labels: labels.len(),
        });
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let map_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(map_err)?;
    writer
        .write_record([id_header, label_header])
        .map_err(map_err)?;
    for (id, label) in ids.iter().zip(labels) {
        writer
            .write_record([id.as_ref(), label.as_ref()])
            .map_err(map_err)?;
    }
    writer.flush().map_err(|err| map_err(err.into()))?;

    info!(path = %path.display(), rows = ids.len(), "wrote predictions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("submission.csv");

        write_predictions(&path, "PassengerId", "Survived", &["892", "893"], &["0", "1"]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "PassengerId,Survived\n892,0\n893,1\n");
    }

    #[test]
    fn test_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let err = write_predictions(&path, "id", "label", &["1", "2"], &["0"]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { ids: 2, labels: 1 }));
        assert!(!path.exists());
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as the output file
        let err = write_predictions(dir.path(), "id", "label", &["1"], &["0"]).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::{WriteError, write_atomically};
use crate::aggregate::gridlist_lines;
use crate::grid::GridField;

/// Writes the CF gridlist of `field` for LPJ-GUESS (`file_gridlist_cf`).
pub fn write_gridlist(field: &GridField, path: &Path) -> Result<(), WriteError> {
    write_atomically(path, |partial| {
        let io_error = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut out = BufWriter::new(File::create(partial).map_err(io_error)?);
        for line in gridlist_lines(field) {
            writeln!(out, "{line}").map_err(io_error)?;
        }
        out.flush().map_err(io_error)
    })?;

    let shape = field.shape();
    info!(path = %path.display(), cells = shape.lat * shape.lon, "wrote gridlist");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridShape;
    use tempfile::tempdir;

    #[test]
    fn test_gridlist_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("gridlist.txt");
        let field = GridField::filled("x", "K", GridShape { steps: 12, lat: 2, lon: 2 }, 0.0);

        write_gridlist(&field, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "0\t0\n0\t1\n1\t0\n1\t1\n");
        assert!(!dir.path().join("nested").join("gridlist.txt.part").exists());
    }
}

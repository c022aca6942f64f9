//! Reading datasets and writing results as plain text.
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::info;

use crate::traits::types::{Error, Result};

/// Parse whitespace separated integers.
pub fn parse_dataset(text: &str) -> Result<Vec<i64>> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<i64>().map_err(|e| Error::Parse {
                token: token.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Read a dataset of whitespace separated integers.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<i64>> {
    let text = fs::read_to_string(path.as_ref())?;
    let data = parse_dataset(&text)?;
    info!(
        "read {} values from {}",
        data.len(),
        path.as_ref().display()
    );
    Ok(data)
}

/// Location of the output of a named run, `<output_dir>/<name>.txt`.
pub fn output_path<P: AsRef<Path>>(output_dir: P, name: &str) -> PathBuf {
    output_dir.as_ref().join(format!("{}.txt", name))
}

fn create<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path.as_ref())?))
}

/// Write a sorted sequence on a single line, space separated.
pub fn write_sorted<P: AsRef<Path>>(path: P, values: &[i64]) -> Result<()> {
    let mut writer = create(path)?;
    write!(writer, "{}", values.iter().join(" "))?;
    writer.flush()?;
    Ok(())
}

/// Write primes one per line.
pub fn write_primes<P: AsRef<Path>>(path: P, primes: &[i64]) -> Result<()> {
    let mut writer = create(path)?;
    for prime in primes {
        writeln!(writer, "{}", prime)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parsort_io_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_parse_dataset() {
        assert_eq!(
            parse_dataset("5 3\n8\t-1  9\n").unwrap(),
            vec![5, 3, 8, -1, 9]
        );
        assert!(parse_dataset("  \n").unwrap().is_empty());

        match parse_dataset("1 2 x3") {
            Err(Error::Parse { token, .. }) => assert_eq!(token, "x3"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_write_and_read_sorted() {
        let dir = scratch_dir("sorted");
        let path = output_path(&dir, "sample_sort");
        write_sorted(&path, &[1, 2, 3, 40]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1 2 3 40");
        assert_eq!(read_dataset(&path).unwrap(), vec![1, 2, 3, 40]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_primes() {
        let dir = scratch_dir("primes");
        let path = output_path(&dir, "primes");
        write_primes(&path, &[11, 13, 17]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "11\n13\n17\n");

        write_primes(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_missing_file() {
        let dir = scratch_dir("missing");
        assert!(matches!(read_dataset(dir.join("absent.txt")), Err(Error::Io(_))));
    }
}

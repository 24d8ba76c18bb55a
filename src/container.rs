//! Container codec
//!
//! Creates empty result files, writes a full result set in one shot, and
//! appends single records to an existing file without re-encoding it.
//!
//! **JSON append invariant**: the file ends with `]` followed by at most two
//! bytes (normally a single `\n`). An append locates that `]` within the
//! last 3 bytes, truncates the file just before it, writes `,` (unless the
//! array is still empty), the compact record, and a fresh `]\n`. A file whose
//! closing bracket sits further back is rejected as `MalformedContainer`.
//!
//! CSV and JSON Lines have no closing delimiter, so appends are plain
//! end-of-file writes.

use crate::config::OutputFormat;
use crate::error::{Result, SimError};
use crate::record::{Record, CSV_HEADER};
use polars::prelude::*;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How far back from end-of-file the closing `]` may sit.
pub const JSON_TAIL_LOOKBACK: u64 = 3;

/// Initial content of an empty JSON container
pub const EMPTY_JSON_ARRAY: &[u8] = b"[]\n";

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> SimError + '_ {
    move |source| SimError::io(path, source)
}

fn csv_header_line() -> String {
    format!("{}\n", CSV_HEADER.join(","))
}

/// Quote a CSV field when it is empty or contains a separator, quote or
/// line break (the same rule Polars applies to batch output).
fn csv_field(field: &str) -> String {
    if field.is_empty() || field.contains(&[',', '"', '\r', '\n'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// One CSV data row, newline-terminated
pub fn csv_row(record: &Record) -> String {
    format!(
        "{},{},{},{}\n",
        csv_field(&record.metric),
        csv_field(&record.s1),
        csv_field(&record.s2),
        record.score_fixed()
    )
}

/// Create (or truncate) `path` as an empty container of the given format.
pub fn initialize_empty(path: &Path, format: OutputFormat) -> Result<()> {
    let contents: Vec<u8> = match format {
        OutputFormat::Json => EMPTY_JSON_ARRAY.to_vec(),
        OutputFormat::Csv => csv_header_line().into_bytes(),
        OutputFormat::JsonLines => Vec::new(),
    };
    fs::write(path, contents).map_err(io_err(path))
}

/// Write a complete result set in one pass (create, truncate, write).
///
/// JSON is pretty-printed and newline-terminated; CSV goes through a Polars
/// `CsvWriter` with 6-decimal fixed-point scores.
pub fn serialize_all(path: &Path, format: OutputFormat, records: &[Record]) -> Result<()> {
    let file = File::create(path).map_err(io_err(path))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n").map_err(io_err(path))?;
        }
        OutputFormat::Csv => {
            let mut df = records_to_frame(records)?;
            CsvWriter::new(&mut writer)
                .include_header(true)
                .with_float_precision(Some(6))
                .finish(&mut df)?;
        }
        OutputFormat::JsonLines => {
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n").map_err(io_err(path))?;
            }
        }
    }

    writer.flush().map_err(io_err(path))
}

fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
    let metric: Vec<&str> = records.iter().map(|r| r.metric.as_str()).collect();
    let s1: Vec<&str> = records.iter().map(|r| r.s1.as_str()).collect();
    let s2: Vec<&str> = records.iter().map(|r| r.s2.as_str()).collect();
    let score: Vec<f64> = records.iter().map(|r| r.score).collect();

    let df = DataFrame::new(vec![
        Series::new(CSV_HEADER[0].into(), metric).into(),
        Series::new(CSV_HEADER[1].into(), s1).into(),
        Series::new(CSV_HEADER[2].into(), s2).into(),
        Series::new(CSV_HEADER[3].into(), score).into(),
    ])?;
    Ok(df)
}

/// An open result file that accepts one record at a time
///
/// Holds the file handle and the "still empty" flag; callers that share it
/// across threads must serialize whole `append` calls.
#[derive(Debug)]
pub struct AppendableContainer {
    file: File,
    path: PathBuf,
    format: OutputFormat,
    is_empty: bool,
}

impl AppendableContainer {
    /// Open an existing container for read/write and probe its emptiness once.
    pub fn open(path: &Path, format: OutputFormat) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(io_err(path))?;

        let is_empty = match format {
            OutputFormat::Json => probe_empty_array(&mut file).map_err(io_err(path))?,
            OutputFormat::Csv => {
                let len = file.metadata().map_err(io_err(path))?.len();
                len <= csv_header_line().len() as u64
            }
            OutputFormat::JsonLines => file.metadata().map_err(io_err(path))?.len() == 0,
        };

        Ok(Self {
            file,
            path: path.to_path_buf(),
            format,
            is_empty,
        })
    }

    /// Initialize `path` as an empty container and open it for appending.
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        initialize_empty(path, format)?;
        Self::open(path, format)
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &Record) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.append_json(record)?,
            OutputFormat::Csv => self.append_line(csv_row(record).as_bytes())?,
            OutputFormat::JsonLines => {
                let mut line = serde_json::to_vec(record)?;
                line.push(b'\n');
                self.append_line(&line)?;
            }
        }
        self.is_empty = false;
        Ok(())
    }

    fn append_line(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::End(0)).map_err(io_err(&self.path))?;
        self.file.write_all(bytes).map_err(io_err(&self.path))?;
        self.file.flush().map_err(io_err(&self.path))
    }

    fn append_json(&mut self, record: &Record) -> Result<()> {
        let close = self.find_closing_bracket()?;

        let mut chunk = Vec::with_capacity(128);
        if !self.is_empty {
            chunk.push(b',');
        }
        serde_json::to_writer(&mut chunk, record)?;
        chunk.extend_from_slice(b"]\n");

        self.file.set_len(close).map_err(io_err(&self.path))?;
        self.file.seek(SeekFrom::Start(close)).map_err(io_err(&self.path))?;
        self.file.write_all(&chunk).map_err(io_err(&self.path))?;
        self.file.flush().map_err(io_err(&self.path))
    }

    /// Byte offset of the closing `]`, scanning back from end-of-file.
    fn find_closing_bracket(&mut self) -> Result<u64> {
        let len = self.file.seek(SeekFrom::End(0)).map_err(io_err(&self.path))?;
        let lookback = JSON_TAIL_LOOKBACK.min(len);

        let mut tail = [0u8; JSON_TAIL_LOOKBACK as usize];
        let tail = &mut tail[..lookback as usize];
        self.file
            .seek(SeekFrom::Start(len - lookback))
            .map_err(io_err(&self.path))?;
        self.file.read_exact(tail).map_err(io_err(&self.path))?;

        tail.iter()
            .rposition(|&b| b == b']')
            .map(|idx| len - lookback + idx as u64)
            .ok_or_else(|| SimError::MalformedContainer {
                path: self.path.clone(),
            })
    }

    /// Flush file contents to disk and close the handle.
    pub fn finish(self) -> Result<()> {
        self.file.sync_all().map_err(io_err(&self.path))
    }
}

/// True when the file starts with `[]` or `[ ]`.
fn probe_empty_array(file: &mut File) -> std::io::Result<bool> {
    file.seek(SeekFrom::Start(0))?;
    let mut head = Vec::with_capacity(3);
    Read::by_ref(file).take(3).read_to_end(&mut head)?;

    Ok(head.starts_with(b"[]") || head.starts_with(b"[ ]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(s2: &str, score: f64) -> Record {
        Record::new("Jaro", "adam", s2, score)
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_initialize_empty() {
        let dir = TempDir::new().unwrap();

        let json = dir.path().join("out.json");
        initialize_empty(&json, OutputFormat::Json).unwrap();
        assert_eq!(read(&json), "[]\n");

        let csv = dir.path().join("out.csv");
        initialize_empty(&csv, OutputFormat::Csv).unwrap();
        assert_eq!(read(&csv), "metric,s1,s2,score\n");
    }

    #[test]
    fn test_append_sequence_to_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut container = AppendableContainer::create(&path, OutputFormat::Json).unwrap();
        assert!(container.is_empty());

        for (s2, score) in [("a", 0.1), ("b", 0.2), ("c", 0.3)] {
            container.append(&record(s2, score)).unwrap();
        }
        assert!(!container.is_empty());
        container.finish().unwrap();

        let text = read(&path);
        assert!(text.ends_with("}]\n"));
        assert!(!text.contains(",]"));
        assert!(!text.starts_with("[,"));
        assert_eq!(text.matches(']').count(), 1);

        let parsed: Vec<Record> = serde_json::from_str(&text).unwrap();
        let order: Vec<&str> = parsed.iter().map(|r| r.s2.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_append_to_non_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, r#"[{"metric":"Jaro","s1":"x","s2":"x","score":1.0}]"#.to_owned() + "\n").unwrap();

        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        assert!(!container.is_empty());
        container.append(&record("a", 0.5)).unwrap();

        let text = read(&path);
        assert!(text.contains("},{"));
        let parsed: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].s1, "x");
        assert_eq!(parsed[1].s2, "a");
    }

    #[test]
    fn test_append_to_spaced_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "[ ]").unwrap();

        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        assert!(container.is_empty());
        container.append(&record("a", 0.5)).unwrap();

        let parsed: Vec<Record> = serde_json::from_str(&read(&path)).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_append_with_space_before_bracket_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        // closing bracket two bytes from the end
        fs::write(&path, "[1] \n").unwrap();

        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        container.append(&record("a", 0.5)).unwrap();

        let text = read(&path);
        assert!(text.starts_with("[1,{"));
        assert!(text.ends_with("}]\n"));
    }

    #[test]
    fn test_append_after_pretty_batch_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        serialize_all(&path, OutputFormat::Json, &[record("x", 0.9)]).unwrap();

        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        container.append(&record("y", 0.1)).unwrap();

        let parsed: Vec<Record> = serde_json::from_str(&read(&path)).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_malformed_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        // bracket too far back
        fs::write(&path, "[]   \n").unwrap();
        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        let err = container.append(&record("a", 0.5)).unwrap_err();
        assert!(matches!(err, SimError::MalformedContainer { .. }));

        // not an array at all
        fs::write(&path, "{}").unwrap();
        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        assert!(container.append(&record("a", 0.5)).is_err());

        // empty file
        fs::write(&path, "").unwrap();
        let mut container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
        assert!(matches!(
            container.append(&record("a", 0.5)).unwrap_err(),
            SimError::MalformedContainer { .. }
        ));
    }

    #[test]
    fn test_csv_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let mut container = AppendableContainer::create(&path, OutputFormat::Csv).unwrap();
        assert!(container.is_empty());
        container.append(&record("adan", 0.883333)).unwrap();
        container.append(&Record::new("Jaro", "a,b", "say \"hi\"", 0.25)).unwrap();
        container.finish().unwrap();

        assert_eq!(
            read(&path),
            "metric,s1,s2,score\nJaro,adam,adan,0.883333\nJaro,\"a,b\",\"say \"\"hi\"\"\",0.250000\n"
        );
    }

    #[test]
    fn test_open_probes_empty_array_forms() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        for (contents, empty) in [("[]\n", true), ("[ ]", true), ("[\n]\n", false), ("[1]\n", false)] {
            fs::write(&path, contents).unwrap();
            let container = AppendableContainer::open(&path, OutputFormat::Json).unwrap();
            assert_eq!(container.is_empty(), empty, "contents {:?}", contents);
        }
    }

    #[test]
    fn test_csv_empty_field_is_quoted() {
        assert_eq!(csv_row(&Record::new("Jaro", "", "x", 0.0)), "Jaro,\"\",x,0.000000\n");
    }

    #[test]
    fn test_csv_append_matches_serialize_all() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            Record::new("Jaro", "", "x", 0.0),
            Record::new("Jaro", " lead", "a;b", 0.5),
            Record::new("Jaro", "a,b", "say \"hi\"", 0.25),
        ];

        let batch = dir.path().join("batch.csv");
        serialize_all(&batch, OutputFormat::Csv, &records).unwrap();

        let streamed = dir.path().join("stream.csv");
        let mut container = AppendableContainer::create(&streamed, OutputFormat::Csv).unwrap();
        for record in &records {
            container.append(record).unwrap();
        }
        container.finish().unwrap();

        assert_eq!(read(&batch), read(&streamed));
    }

    #[test]
    fn test_json_lines_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut container = AppendableContainer::create(&path, OutputFormat::JsonLines).unwrap();
        container.append(&record("a", 0.1)).unwrap();
        container.append(&record("b", 0.2)).unwrap();

        let text = read(&path);
        let parsed: Vec<Record> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_serialize_all_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let records = vec![record("a", 0.1), record("b", 0.2)];

        serialize_all(&path, OutputFormat::Json, &records).unwrap();
        let text = read(&path);
        assert!(text.ends_with("]\n"));

        let parsed: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_serialize_all_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        serialize_all(&path, OutputFormat::Csv, &[record("adan", 0.883333)]).unwrap();

        let text = read(&path);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("metric,s1,s2,score"));
        assert_eq!(lines.next(), Some("Jaro,adam,adan,0.883333"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_io_error_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.json");

        let err = initialize_empty(&path, OutputFormat::Json).unwrap_err();
        assert!(matches!(err, SimError::Io { path: ref p, .. } if p == &path));
    }
}

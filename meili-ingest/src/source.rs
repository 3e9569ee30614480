//! Document sources: JSON, NDJSON and CSV files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::IngestError;
use meili_client::MeiliError;
use meili_shared::Document;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// A single JSON array of objects.
    #[default]
    Json,
    /// One JSON object per line.
    Ndjson,
    /// A header row followed by one row per document; every value is a string.
    Csv,
}

impl DocumentFormat {
    /// Format of a file, from its extension.
    pub fn from_path(path: &Path) -> Result<Self, MeiliError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("ndjson") => Ok(Self::Ndjson),
            Some("csv") => Ok(Self::Csv),
            _ => Err(MeiliError::validation(format!(
                "File must be a json, ndjson, or csv file: {}",
                path.display()
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Csv => "csv",
        }
    }
}

/// Check that a CSV delimiter is a single ASCII character.
pub fn validate_csv_delimiter(delimiter: char) -> Result<u8, MeiliError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(MeiliError::validation(
            "csv_delimiter must be a single ascii character",
        ))
    }
}

/// Read the documents of a JSON, NDJSON or CSV file.
///
/// # Errors
///
/// * `ValidationError` - unsupported extension, a delimiter for a non-CSV
///   file, or a non-ASCII delimiter
/// * `InvalidDocument` - the file is not a list of objects
pub fn load_documents_from_file(
    path: &Path,
    csv_delimiter: Option<char>,
) -> Result<Vec<Document>, IngestError> {
    let format = DocumentFormat::from_path(path)?;
    if csv_delimiter.is_some() && format != DocumentFormat::Csv {
        return Err(MeiliError::validation("A csv_delimiter can only be used with csv files").into());
    }

    let documents = match format {
        DocumentFormat::Csv => {
            let delimiter = csv_delimiter
                .map(validate_csv_delimiter)
                .transpose()?
                .unwrap_or(b',');
            read_csv(path, delimiter)?
        }
        DocumentFormat::Ndjson => read_ndjson(path)?,
        DocumentFormat::Json => read_json(path)?,
    };

    debug!(path = %path.display(), count = documents.len(), "Loaded documents from file");
    Ok(documents)
}

fn read_json(path: &Path) -> Result<Vec<Document>, IngestError> {
    let reader = BufReader::new(File::open(path)?);
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| IngestError::parse(format!("{}: {}", path.display(), e)))?;

    let Value::Array(items) = value else {
        return Err(MeiliError::invalid_document("Meilisearch requires documents to be in a list").into());
    };
    items.into_iter().map(into_document).collect()
}

fn read_ndjson(path: &Path) -> Result<Vec<Document>, IngestError> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).map_err(|e| {
            IngestError::parse(format!("{} line {}: {}", path.display(), number + 1, e))
        })?;
        documents.push(into_document(value)?);
    }

    Ok(documents)
}

fn read_csv(path: &Path, delimiter: u8) -> Result<Vec<Document>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut documents = Vec::new();
    for record in reader.records() {
        let record = record?;
        let document: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        documents.push(document);
    }

    Ok(documents)
}

fn into_document(value: Value) -> Result<Document, IngestError> {
    meili_shared::document::from_value(value)
        .ok_or_else(|| MeiliError::invalid_document("Documents must be JSON objects").into())
}

//! Reading and writing cost matrices as delimited text.
//!
//! The expected layout is an optional header row of node labels followed by
//! one row per node. When the first header cell is blank or `-`, every data
//! row starts with its label and that column is dropped:
//!
//! ```text
//! -,A,B,C
//! A,,10,15
//! B,12,,inf
//! C,8,18,
//! ```
//!
//! Blank and `inf` cells are forbidden edges. Diagonal cells are ignored.

use crate::error::{Result, TspError};
use crate::graph::CostGraph;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Options for reading a cost matrix file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// First non-blank row holds node labels
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            has_header: true,
            delimiter: b',',
        }
    }
}

/// Raw cells of a matrix file, untrimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatrix {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Load a cost graph from a file.
pub fn read_cost_matrix<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<CostGraph> {
    let path = path.as_ref();
    log::debug!("reading cost matrix from {}", path.display());
    let file = File::open(path)?;
    read_cost_matrix_from(file, options)
}

/// Load a cost graph from any reader.
pub fn read_cost_matrix_from<R: Read>(reader: R, options: &ReaderOptions) -> Result<CostGraph> {
    let raw = read_rows(reader, options)?;
    create_graph(raw.rows, raw.header)
}

/// Split the input into rows of cells, skipping rows with only blank cells.
pub fn read_rows<R: Read>(reader: R, options: &ReaderOptions) -> Result<RawMatrix> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    if rows.is_empty() {
        return Err(TspError::Validation("empty CSV".to_string()));
    }

    let header = if options.has_header {
        Some(rows.remove(0))
    } else {
        None
    };

    Ok(RawMatrix { header, rows })
}

/// Check the shape of raw rows and build the graph.
pub fn create_graph(rows: Vec<Vec<String>>, header: Option<Vec<String>>) -> Result<CostGraph> {
    let n = rows.len();
    if n < 2 {
        return Err(TspError::Validation("matrix must have at least two rows".to_string()));
    }

    let mut rows = rows;
    let mut labels = None;

    if let Some(mut header) = header {
        if header.len() < 2 {
            return Err(TspError::Validation("header must have at least two cells".to_string()));
        }

        let label_column = matches!(header[0].trim(), "" | "-");
        if label_column {
            header.remove(0);
        }

        if header.len() != n {
            return Err(TspError::Validation(
                "header must have the same number of cells as the number of rows".to_string(),
            ));
        }

        labels = Some(header.iter().map(|cell| cell.trim().to_string()).collect::<Vec<_>>());
        if label_column {
            for row in rows.iter_mut() {
                if !row.is_empty() {
                    row.remove(0);
                }
            }
        }
    }

    if rows.iter().any(|row| row.len() != n) {
        return Err(TspError::Validation(
            "each row must have the same number of cells as the header".to_string(),
        ));
    }

    let graph = CostGraph::build(rows, labels)?;
    log::info!("loaded cost matrix with {} nodes", graph.n());
    Ok(graph)
}

/// Write `graph` with a label column, forbidden edges as `inf`.
pub fn write_cost_matrix<W: Write>(graph: &CostGraph, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(graph.n() + 1);
    header.push("-".to_string());
    header.extend(graph.labels().iter().cloned());
    csv_writer.write_record(&header)?;

    for (i, label) in graph.labels().iter().enumerate() {
        let mut record = Vec::with_capacity(graph.n() + 1);
        record.push(label.clone());
        record.extend((0..graph.n()).map(|j| graph.edge(i, j).to_string()));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write `graph` to a file.
pub fn save_cost_matrix<P: AsRef<Path>>(graph: &CostGraph, path: P) -> Result<()> {
    let file = File::create(path)?;
    write_cost_matrix(graph, file)
}

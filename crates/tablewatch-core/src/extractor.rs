//! Table extraction from rendered markup.

use std::time::{Duration, Instant};

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ExtractError;

/// One cycle's table: header names, each with an ordered column of cell
/// text. All columns have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl TableSnapshot {
    /// Build a snapshot from a header row and body rows.
    ///
    /// Rows with no cells are dropped. Rows are transposed into columns,
    /// truncating to the shortest row and to the number of headers; headers
    /// beyond the available columns get no column.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows: Vec<Vec<String>> = rows.into_iter().filter(|r| !r.is_empty()).collect();

        let width = rows.iter().map(Vec::len).min().unwrap_or(headers.len());
        let width = width.min(headers.len());
        if rows.iter().any(|r| r.len() != width) || headers.len() != width {
            debug!(
                headers = headers.len(),
                width, "Truncating ragged table to shortest row"
            );
        }

        let mut columns: Vec<Vec<String>> = (0..width)
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }

        let mut headers = headers;
        headers.truncate(width);
        Self { headers, columns }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of body rows.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// The cells under `header`, in row order.
    pub fn column(&self, header: &str) -> Result<&[String], ExtractError> {
        let mut matches = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() == header);
        let (index, _) = matches
            .next()
            .ok_or_else(|| ExtractError::UnknownColumn(header.to_string()))?;
        if matches.next().is_some() {
            return Err(ExtractError::AmbiguousColumn(header.to_string()));
        }
        Ok(&self.columns[index])
    }

    /// The cell at (`row`, `column`), where `row` is looked up in the
    /// `label_column` column and must match exactly one row.
    pub fn cell(&self, label_column: &str, row: &str, column: &str) -> Result<&str, ExtractError> {
        let labels = self.column(label_column)?;
        let values = self.column(column)?;

        let mut hits = labels.iter().enumerate().filter(|(_, l)| l.as_str() == row);
        let (index, _) = hits.next().ok_or_else(|| ExtractError::RowNotFound {
            row: row.to_string(),
            column: label_column.to_string(),
        })?;
        let extra = hits.count();
        if extra > 0 {
            return Err(ExtractError::AmbiguousRow {
                row: row.to_string(),
                column: label_column.to_string(),
                count: extra + 1,
            });
        }
        Ok(values[index].as_str())
    }
}

/// Stage timings of one extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractProfile {
    /// Markup parse.
    pub parse: Duration,
    /// Table location, header/body walk and transpose.
    pub build: Duration,
}

/// Locates one table by attribute and turns it into a [`TableSnapshot`].
#[derive(Debug, Clone)]
pub struct TableExtractor {
    locator: String,
    table: Selector,
    head: Selector,
    header_cell: Selector,
    row: Selector,
    cell: Selector,
}

impl TableExtractor {
    /// `locator` is a CSS selector identifying the table, e.g.
    /// `table[id="bonds"]`.
    pub fn new(locator: impl Into<String>) -> Result<Self, ExtractError> {
        let locator = locator.into();
        let table =
            Selector::parse(&locator).map_err(|_| ExtractError::InvalidLocator(locator.clone()))?;
        Ok(Self {
            table,
            head: fixed_selector("thead")?,
            header_cell: fixed_selector("th")?,
            row: fixed_selector("tr")?,
            cell: fixed_selector("td")?,
            locator,
        })
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn extract(&self, markup: &str) -> Result<TableSnapshot, ExtractError> {
        self.extract_profiled(markup).map(|(snapshot, _)| snapshot)
    }

    /// Extract and report how long each stage took.
    pub fn extract_profiled(
        &self,
        markup: &str,
    ) -> Result<(TableSnapshot, ExtractProfile), ExtractError> {
        let started = Instant::now();
        let document = Html::parse_document(markup);
        let parse = started.elapsed();

        let started = Instant::now();
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ExtractError::TableNotFound(self.locator.clone()))?;
        let head = table
            .select(&self.head)
            .next()
            .ok_or_else(|| ExtractError::MissingHead(self.locator.clone()))?;

        let headers: Vec<String> = head.select(&self.header_cell).map(text_of).collect();
        let rows: Vec<Vec<String>> = table
            .select(&self.row)
            .map(|row| row.select(&self.cell).map(text_of).collect())
            .collect();

        let snapshot = TableSnapshot::from_rows(headers, rows);
        let build = started.elapsed();

        debug!(
            rows = snapshot.row_count(),
            columns = snapshot.headers().len(),
            "Extracted table"
        );
        Ok((snapshot, ExtractProfile { parse, build }))
    }
}

fn fixed_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidLocator(css.to_string()))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;

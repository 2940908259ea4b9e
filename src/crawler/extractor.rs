use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::Browser;
use crate::cli::config::SiteSettings;
use crate::crawler::context::{CrawlContext, LogFailure};
use crate::crawler::tab::TabScope;
use crate::error::{CrawlError, Result};

/// Columns of the announcement table, in page order
const COLUMN_COUNT: usize = 5;

/// One row of the announcement table. Every column stays text; stock codes
/// carry leading zeros that must survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRow {
    pub stock_code: String,
    pub stock_name: String,
    pub date: String,
    pub title: String,
    pub memo: String,
}

/// Finds the results table belonging to one tab
pub trait TableLocator {
    fn locate<'a>(&self, document: &'a Html, tab: &TabScope) -> Result<ElementRef<'a>>;
}

/// Looks inside the tab's own container for the first table of the results
/// class that holds a data cell. Empty same-class tables elsewhere are skipped.
pub struct ScopedTableLocator {
    table: Selector,
    data_cell: Selector,
}

impl ScopedTableLocator {
    pub fn new(site: &SiteSettings) -> Result<Self> {
        Ok(Self {
            table: parse_selector(&site.table_css)?,
            data_cell: parse_selector(&site.data_cell_css)?,
        })
    }
}

impl TableLocator for ScopedTableLocator {
    fn locate<'a>(&self, document: &'a Html, tab: &TabScope) -> Result<ElementRef<'a>> {
        let scope = parse_selector(&tab.settings.table_scope)?;

        document
            .select(&scope)
            .flat_map(|container| container.select(&self.table))
            .find(|table| table.select(&self.data_cell).next().is_some())
            .ok_or_else(|| {
                CrawlError::Parse(format!(
                    "no results table with data under {} for {} tab",
                    tab.settings.table_scope,
                    tab.label()
                ))
            })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::Parse(format!("selector {}: {:?}", css, e)))
}

/// Parse the table of `tab` out of a page snapshot
pub fn extract_rows(html: &str, locator: &dyn TableLocator, tab: &TabScope) -> Result<Vec<AnnouncementRow>> {
    let document = Html::parse_document(html);
    let table = locator.locate(&document, tab)?;
    parse_table(table)
}

/// Convert table rows into announcements. Only `td` cells are read, so header
/// rows and the table's `colgroup` definition never shift the columns.
fn parse_table(table: ElementRef<'_>) -> Result<Vec<AnnouncementRow>> {
    let row_selector = parse_selector("tr")?;
    let cell_selector = parse_selector("td")?;
    let mut rows = Vec::new();

    for (index, tr) in table.select(&row_selector).enumerate() {
        let cells: Vec<ElementRef<'_>> = tr.select(&cell_selector).collect();

        if cells.is_empty() {
            continue;
        }

        // "No data" placeholder spanning the whole table
        if cells.len() == 1 && cells[0].value().attr("colspan").is_some() {
            debug!("Skipping placeholder row: {}", cell_text(cells[0]));
            continue;
        }

        if cells.len() < COLUMN_COUNT {
            return Err(CrawlError::Parse(format!(
                "row {} has {} cells, expected {}",
                index,
                cells.len(),
                COLUMN_COUNT
            )));
        }

        rows.push(AnnouncementRow {
            stock_code: cell_text(cells[0]),
            stock_name: cell_text(cells[1]),
            date: cell_text(cells[2]),
            title: cell_text(cells[3]),
            memo: cell_text(cells[4]),
        });
    }

    Ok(rows)
}

/// Text content with runs of whitespace collapsed
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pulls the rows of the currently rendered page
pub struct RowExtractor<'a> {
    browser: &'a dyn Browser,
    ctx: &'a CrawlContext,
    locator: &'a dyn TableLocator,
}

impl<'a> RowExtractor<'a> {
    pub fn new(browser: &'a dyn Browser, ctx: &'a CrawlContext, locator: &'a dyn TableLocator) -> Self {
        Self { browser, ctx, locator }
    }

    pub async fn extract(&self, tab: &TabScope) -> Result<Vec<AnnouncementRow>> {
        self.try_extract(tab).await.log_failure(self.ctx, "get_page_rows")
    }

    async fn try_extract(&self, tab: &TabScope) -> Result<Vec<AnnouncementRow>> {
        self.browser.scroll_to_bottom().await?;
        let source = self.browser.page_source().await?;
        let rows = extract_rows(&source, self.locator, tab)?;
        debug!("Extracted {} rows from {} tab", rows.len(), tab.label());
        Ok(rows)
    }
}

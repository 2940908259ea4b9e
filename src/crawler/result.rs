use serde::{Deserialize, Serialize};

use crate::crawler::extractor::AnnouncementRow;
use crate::crawler::tab::TabId;

/// Rows gathered from one tab, in page order
#[derive(Debug, Clone)]
pub struct TabResult {
    tab: TabId,
    pages: u32,
    rows: Vec<AnnouncementRow>,
}

impl TabResult {
    pub fn new(tab: TabId) -> Self {
        Self {
            tab,
            pages: 0,
            rows: Vec::new(),
        }
    }

    /// Append the rows of the next page
    pub fn push_page(&mut self, rows: Vec<AnnouncementRow>) {
        self.pages += 1;
        self.rows.extend(rows);
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<AnnouncementRow> {
        self.rows
    }
}

/// An announcement as written to the output file. The stock name is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    #[serde(rename = "Stock Code")]
    pub stock_code: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Memo")]
    pub memo: String,
}

impl AnnouncementRecord {
    pub const HEADERS: [&'static str; 4] = ["Stock Code", "Date", "Title", "Memo"];
}

impl From<AnnouncementRow> for AnnouncementRecord {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            stock_code: row.stock_code,
            date: row.date,
            title: row.title,
            memo: row.memo,
        }
    }
}

/// Merged, cleaned output of a successful crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    records: Vec<AnnouncementRecord>,
}

impl CrawlResult {
    /// Concatenate tab results in the order given
    pub fn merge(tabs: impl IntoIterator<Item = TabResult>) -> Self {
        Self::from_rows(tabs.into_iter().flat_map(TabResult::into_rows))
    }

    pub fn from_rows(rows: impl IntoIterator<Item = AnnouncementRow>) -> Self {
        Self {
            records: rows.into_iter().map(AnnouncementRecord::from).collect(),
        }
    }

    pub fn records(&self) -> &[AnnouncementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

use std::fmt;

use crate::cli::config::{SiteSettings, TabSettings};

/// The two report tabs of the announcement listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabId {
    First,
    Second,
}

impl TabId {
    pub const ALL: [TabId; 2] = [TabId::First, TabId::Second];

    pub fn number(self) -> u8 {
        match self {
            TabId::First => 1,
            TabId::Second => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(TabId::First),
            2 => Some(TabId::Second),
            _ => None,
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab {}", self.number())
    }
}

/// A tab together with the controls that address it. Every tab-specific
/// lookup goes through this token so the two tabs never share a selector.
#[derive(Debug, Clone)]
pub struct TabScope {
    pub id: TabId,
    pub settings: TabSettings,
}

impl TabScope {
    pub fn new(id: TabId, site: &SiteSettings) -> Self {
        let settings = match id {
            TabId::First => site.tab1.clone(),
            TabId::Second => site.tab2.clone(),
        };
        Self { id, settings }
    }

    pub fn label(&self) -> &str {
        &self.settings.label
    }

    /// Whether the tab has to be activated after the page loads
    pub fn needs_switch(&self) -> bool {
        self.settings.switch_xpath.is_some()
    }

    pub fn nav_xpath(&self) -> String {
        format!(r#"//div[@id="{}"]"#, self.settings.nav_id)
    }

    /// Page indicator inside this tab's navigation container
    pub fn indicator_xpath(&self) -> String {
        format!(r#"{}//div[@class="current-page"]"#, self.nav_xpath())
    }

    /// "Next page" control inside this tab's navigation container
    pub fn next_xpath(&self) -> String {
        format!(r#"{}//li[@class="next"]"#, self.nav_xpath())
    }

    /// Matches the current-page number only while it reads something other than `page`
    pub fn page_moved_xpath(&self, page: u32) -> String {
        format!(
            r#"{}//span[@class="num-cur" and normalize-space(text())!="{}"]"#,
            self.indicator_xpath(),
            page
        )
    }

    pub fn current_page_css(&self) -> String {
        format!(r#"div[id="{}"] div.current-page span.num-cur"#, self.settings.nav_id)
    }

    pub fn total_pages_css(&self) -> String {
        format!(r#"div[id="{}"] div.current-page span.num-all"#, self.settings.nav_id)
    }
}

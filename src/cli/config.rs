use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use tracing::{info, debug, error};
use url::Url;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CrawlerConfig {
    pub site: SiteSettings,
    pub browser: BrowserSettings,
    pub waits: WaitSettings,
    pub retry: RetrySettings,
    pub output: OutputSettings,
}

/// Target site and the selectors used to drive it
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SiteSettings {
    pub url: String,
    /// Loading overlay shown around asynchronous updates
    pub overlay_xpath: String,
    /// Container that carries a loading class while a page is fetched
    pub loading_xpath: String,
    /// Results table that must exist before the date filter is touched
    pub results_table_xpath: String,
    /// Confirm/search buttons; each tab picks one by index
    pub confirm_xpath: String,
    pub table_css: String,
    pub data_cell_css: String,
    pub tab1: TabSettings,
    pub tab2: TabSettings,
}

/// Per-tab controls
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TabSettings {
    pub label: String,
    /// Control that activates the tab, if it is not the default one
    pub switch_xpath: Option<String>,
    pub start_date_xpath: String,
    pub end_date_xpath: String,
    pub confirm_index: usize,
    /// Id of the navigation container holding the page indicator
    pub nav_id: String,
    /// CSS selector of the element enclosing this tab's results table
    pub table_scope: String,
}

/// Browser automation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub browser_type: String,  // "firefox", "chrome"
    pub headless: bool,
    pub page_load_timeout_secs: u64,
}

/// Bounded waits used while synchronising with the page
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WaitSettings {
    pub overlay_timeout_secs: u64,
    pub filter_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// How long to look for an overlay to appear before assuming it was missed
    pub appear_grace_ms: u64,
    pub scroll_pause_ms: u64,
    pub max_scroll_rounds: u32,
    /// Extra clicks on "next" when the page indicator did not move
    pub advance_retries: u32,
}

/// Whole-run retry strategy
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

/// Output file settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputSettings {
    pub path: PathBuf,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            url: "https://www.szse.cn/English/disclosures/announcements/".to_string(),
            overlay_xpath: r#"//div[@class="c-loading-overlay"]"#.to_string(),
            loading_xpath: r#"//div[@class="report-container c-loading"]"#.to_string(),
            results_table_xpath: r#"//table[@class="table table-responsive table-tab1"]"#.to_string(),
            confirm_xpath: r#"//button[@class="confirm-query btn-query-primary"]"#.to_string(),
            table_css: "table.table-tab1".to_string(),
            data_cell_css: "td.text-center".to_string(),
            tab1: TabSettings {
                label: "1st".to_string(),
                switch_xpath: None,
                start_date_xpath: r#"//input[@id="1845_tab1_startDate"]"#.to_string(),
                end_date_xpath: r#"//input[@id="1845_tab1_endDate"]"#.to_string(),
                confirm_index: 0,
                nav_id: "1845_nav1".to_string(),
                table_scope: r#"div[id="1845_tab1"]"#.to_string(),
            },
            tab2: TabSettings {
                label: "2nd".to_string(),
                switch_xpath: Some(r#"//a[text()="ChiNext" and @class="tab"]"#.to_string()),
                start_date_xpath: r#"//input[@id="1845_tab2_startDate"]"#.to_string(),
                end_date_xpath: r#"//input[@id="1845_tab2_endDate"]"#.to_string(),
                confirm_index: 1,
                nav_id: "1845_nav2".to_string(),
                table_scope: r#"div[id="1845_tab2"]"#.to_string(),
            },
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            browser_type: "firefox".to_string(),
            headless: true,
            page_load_timeout_secs: 30,
        }
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            overlay_timeout_secs: 10,
            filter_timeout_secs: 15,
            page_timeout_secs: 15,
            poll_interval_ms: 250,
            appear_grace_ms: 2000,
            scroll_pause_ms: 2000,
            max_scroll_rounds: 20,
            advance_retries: 2,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay_ms: 0,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("shenzhen_announcement.csv"),
        }
    }
}

impl WaitSettings {
    pub fn overlay_timeout(&self) -> Duration {
        Duration::from_secs(self.overlay_timeout_secs)
    }

    pub fn filter_timeout(&self) -> Duration {
        Duration::from_secs(self.filter_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn appear_grace(&self) -> Duration {
        Duration::from_millis(self.appear_grace_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

impl CrawlerConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "announcement-crawler", "announcement-crawler") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        path
    }

    /// Path of the default configuration file
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("default.yaml")
    }

    /// Load an explicit configuration file, or the default one
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the default configuration
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_path();

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            // Create and save the default configuration
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_as_default()?;
            Ok(config)
        }
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Check values that would otherwise fail deep inside a crawl
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.site.url)
            .context(format!("Invalid site URL: {}", self.site.url))?;

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if self.site.tab1.confirm_index == self.site.tab2.confirm_index {
            anyhow::bail!("Both tabs use confirm button {}", self.site.tab1.confirm_index);
        }

        if self.site.tab1.nav_id == self.site.tab2.nav_id {
            anyhow::bail!("Both tabs use navigation container '{}'", self.site.tab1.nav_id);
        }

        match self.browser.browser_type.as_str() {
            "firefox" | "chrome" => Ok(()),
            other => anyhow::bail!("Unsupported browser type: {}", other),
        }
    }

    /// Save the configuration as the default
    pub fn save_as_default(&self) -> Result<()> {
        self.save_to_file(&Self::default_path())
    }

    /// Save the configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }
}

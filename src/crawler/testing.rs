//! Scripted in-memory stand-in for the announcement site.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::browser::{Browser, BrowserLauncher};
use crate::cli::config::{CrawlerConfig, SiteSettings};
use crate::crawler::context::CrawlContext;
use crate::crawler::extractor::AnnouncementRow;
use crate::crawler::shutdown::ShutdownTrigger;
use crate::crawler::tab::{TabId, TabScope};
use crate::error::{CrawlError, Result};
use crate::utils::OperatorIdentity;

/// Context with waits short enough for tests
pub fn fast_config() -> CrawlerConfig {
    let mut config = CrawlerConfig::default();
    config.waits.poll_interval_ms = 1;
    config.waits.appear_grace_ms = 5;
    config.waits.scroll_pause_ms = 0;
    config.waits.overlay_timeout_secs = 1;
    config.waits.filter_timeout_secs = 1;
    config.waits.page_timeout_secs = 1;
    config.waits.advance_retries = 1;
    config
}

pub fn fast_context() -> CrawlContext {
    CrawlContext::new(&fast_config(), OperatorIdentity::new("127.0.0.1", "tester"))
}

pub fn row(code: &str, title: &str) -> AnnouncementRow {
    AnnouncementRow {
        stock_code: code.to_string(),
        stock_name: format!("Company {}", code),
        date: "2026-10-12".to_string(),
        title: title.to_string(),
        memo: String::new(),
    }
}

/// `sizes[n]` rows on page `n + 1`, codes numbered from `first_code`
pub fn pages(first_code: u32, sizes: &[usize]) -> Vec<Vec<AnnouncementRow>> {
    let mut code = first_code;
    sizes
        .iter()
        .map(|&size| {
            (0..size)
                .map(|_| {
                    code += 1;
                    row(&format!("{:06}", code), &format!("Announcement {}", code))
                })
                .collect()
        })
        .collect()
}

/// What the fake site serves and how it misbehaves
#[derive(Debug, Clone, Default)]
pub struct SiteScript {
    pub tab1: Vec<Vec<AnnouncementRow>>,
    pub tab2: Vec<Vec<AnnouncementRow>>,
    /// Clicks on "next" that are swallowed before one takes effect
    pub ignored_next_clicks: u32,
    /// Each "next" click jumps this many pages instead of one
    pub next_step: Option<usize>,
    pub missing_next: bool,
    pub unreachable: bool,
    /// Fired when a page past the first is served
    pub interrupt: Option<Arc<ShutdownTrigger>>,
}

impl SiteScript {
    pub fn new(tab1: Vec<Vec<AnnouncementRow>>, tab2: Vec<Vec<AnnouncementRow>>) -> Self {
        Self { tab1, tab2, ..Default::default() }
    }
}

#[derive(Debug, Default)]
struct SiteState {
    loaded: bool,
    active_tab: usize,
    filtered: [bool; 2],
    current: [usize; 2],
    inputs: HashMap<String, String>,
    overlay_polls: u32,
    loading_polls: u32,
    ignored_next_clicks: u32,
    scroll_height: i64,
}

/// Fake browser session rendering the announcement page from a script
pub struct FakeSite {
    site: SiteSettings,
    tabs: [TabScope; 2],
    script: SiteScript,
    state: Mutex<SiteState>,
    closed: Arc<AtomicBool>,
}

impl FakeSite {
    pub fn new(site: SiteSettings, script: SiteScript) -> Self {
        let tabs = [
            TabScope::new(TabId::First, &site),
            TabScope::new(TabId::Second, &site),
        ];
        let state = SiteState {
            ignored_next_clicks: script.ignored_next_clicks,
            ..Default::default()
        };
        Self {
            site,
            tabs,
            script,
            state: Mutex::new(state),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    fn pages(&self, tab: usize) -> &[Vec<AnnouncementRow>] {
        if tab == 0 { &self.script.tab1 } else { &self.script.tab2 }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    fn tab_of_next(&self, xpath: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.next_xpath() == xpath)
    }

    fn tab_of_indicator(&self, xpath: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.indicator_xpath() == xpath)
    }

    /// Re-check like a WebDriver wait does, one millisecond apart
    async fn poll_until(&self, timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if check() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(1)).await;
        }
    }

    fn shown_page(&self, state: &SiteState, tab: usize) -> usize {
        if self.pages(tab).is_empty() { 0 } else { state.current[tab] + 1 }
    }

    /// Number of elements matching `xpath`
    fn present(&self, xpath: &str) -> usize {
        let state = self.lock();
        if !state.loaded {
            return 0;
        }

        if xpath == self.site.confirm_xpath {
            return 2;
        }
        if xpath == self.site.results_table_xpath
            || xpath == self.site.overlay_xpath
            || xpath == self.site.loading_xpath
        {
            return 1;
        }
        for (index, tab) in self.tabs.iter().enumerate() {
            if xpath.starts_with(&format!("{}//span", tab.indicator_xpath())) {
                let moved = xpath != tab.page_moved_xpath(self.shown_page(&state, index) as u32);
                return usize::from(state.filtered[index] && moved);
            }
        }
        if let Some(tab) = self.tab_of_indicator(xpath) {
            return usize::from(state.filtered[tab]);
        }
        if let Some(tab) = self.tab_of_next(xpath) {
            return usize::from(state.filtered[tab] && !self.script.missing_next);
        }
        if self.tabs.iter().any(|t| t.settings.start_date_xpath == xpath || t.settings.end_date_xpath == xpath) {
            return 1;
        }
        0
    }

    /// Number of displayed elements matching `xpath`. Overlays stay up for one check.
    fn visible(&self, xpath: &str) -> usize {
        {
            let mut state = self.lock();
            if xpath == self.site.overlay_xpath {
                let visible = state.overlay_polls > 0;
                state.overlay_polls = state.overlay_polls.saturating_sub(1);
                return usize::from(visible);
            }
            if xpath == self.site.loading_xpath {
                let visible = state.loading_polls > 0;
                state.loading_polls = state.loading_polls.saturating_sub(1);
                return usize::from(visible);
            }
        }
        self.present(xpath)
    }

    fn render_rows(rows: &[AnnouncementRow]) -> String {
        rows.iter()
            .map(|r| {
                format!(
                    r#"<tr><td class="text-center">{}</td><td class="text-center">{}</td><td class="text-center">{}</td><td><a href="/f.pdf">{}</a></td><td class="text-center">{}</td></tr>"#,
                    r.stock_code, r.stock_name, r.date, r.title, r.memo
                )
            })
            .collect()
    }

    fn render(&self, state: &SiteState) -> String {
        let mut html = String::from("<html><body>");

        // A same-class table outside both tab scopes
        html.push_str(r#"<table class="table table-responsive table-tab1"><tbody><tr><td class="text-center">999999</td><td>x</td><td>x</td><td>x</td><td>x</td></tr></tbody></table>"#);

        for (index, tab) in self.tabs.iter().enumerate() {
            let pages = self.pages(index);
            let body = if state.filtered[index] {
                match pages.get(state.current[index]) {
                    Some(rows) if !rows.is_empty() => Self::render_rows(rows),
                    _ => r#"<tr><td class="text-center" colspan="5">No data</td></tr>"#.to_string(),
                }
            } else {
                String::new()
            };

            html.push_str(&format!(
                r#"<div id="{}"><table class="table table-responsive table-tab1"><colgroup><col><col><col><col><col></colgroup><thead><tr><th>Code</th><th>Name</th><th>Date</th><th>Title</th><th>Memo</th></tr></thead><tbody>{}</tbody></table></div>"#,
                tab_scope_id(index),
                body
            ));

            if state.filtered[index] {
                html.push_str(&format!(
                    r#"<div id="{}"><div class="current-page"><span class="num-cur">{}</span>/<span class="num-all">{}</span></div><ul><li class="next">next</li></ul></div>"#,
                    tab.settings.nav_id,
                    self.shown_page(state, index),
                    pages.len()
                ));
            }
        }

        html.push_str("</body></html>");
        html
    }
}

fn tab_scope_id(index: usize) -> &'static str {
    if index == 0 { "1845_tab1" } else { "1845_tab2" }
}

#[async_trait]
impl Browser for FakeSite {
    async fn navigate(&self, url: &str) -> Result<()> {
        if self.script.unreachable {
            return Err(CrawlError::Browser(format!("Failed to navigate to URL {}: unreachable", url)));
        }
        let mut state = self.lock();
        state.loaded = true;
        state.active_tab = 0;
        state.overlay_polls = 1;
        Ok(())
    }

    async fn wait_present(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        Ok(self.poll_until(timeout, || self.present(xpath) > 0).await)
    }

    async fn wait_visible(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        Ok(self.poll_until(timeout, || self.visible(xpath) > 0).await)
    }

    async fn wait_invisible(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        Ok(self.poll_until(timeout, || self.visible(xpath) == 0).await)
    }

    async fn click(&self, xpath: &str, index: usize) -> Result<()> {
        let mut state = self.lock();
        if !state.loaded {
            return Err(CrawlError::ElementNotFound(xpath.to_string()));
        }

        if Some(xpath) == self.tabs[1].settings.switch_xpath.as_deref() {
            state.active_tab = 1;
            state.overlay_polls = 1;
            return Ok(());
        }

        if xpath == self.site.confirm_xpath {
            let tab = self
                .tabs
                .iter()
                .position(|t| t.settings.confirm_index == index)
                .ok_or_else(|| CrawlError::ElementNotFound(format!("{} (index {})", xpath, index)))?;
            if tab != state.active_tab {
                return Err(CrawlError::Browser("element not interactable".to_string()));
            }
            let settings = &self.tabs[tab].settings;
            if !state.inputs.contains_key(&settings.start_date_xpath)
                || !state.inputs.contains_key(&settings.end_date_xpath)
            {
                return Err(CrawlError::Browser("date range not set".to_string()));
            }
            state.filtered[tab] = true;
            state.current[tab] = 0;
            state.overlay_polls = 1;
            return Ok(());
        }

        if let Some(tab) = self.tab_of_next(xpath) {
            if self.script.missing_next || !state.filtered[tab] {
                return Err(CrawlError::ElementNotFound(xpath.to_string()));
            }
            state.loading_polls = 1;
            if state.ignored_next_clicks > 0 {
                state.ignored_next_clicks -= 1;
                return Ok(());
            }
            let last = self.pages(tab).len().saturating_sub(1);
            let step = self.script.next_step.unwrap_or(1);
            state.current[tab] = (state.current[tab] + step).min(last);
            return Ok(());
        }

        Err(CrawlError::ElementNotFound(xpath.to_string()))
    }

    async fn fill(&self, xpath: &str, text: &str) -> Result<()> {
        let mut state = self.lock();
        state.inputs.insert(xpath.to_string(), text.to_string());
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<i64> {
        let mut state = self.lock();
        // Grows once, then settles
        if state.scroll_height == 0 {
            state.scroll_height = 1200;
        } else {
            state.scroll_height = 2400;
        }
        Ok(state.scroll_height)
    }

    async fn page_source(&self) -> Result<String> {
        let state = self.lock();
        let tab = state.active_tab;
        if state.filtered[tab] && state.current[tab] >= 1 {
            if let Some(interrupt) = &self.script.interrupt {
                interrupt.trigger();
            }
        }
        Ok(self.render(&state))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out fake sessions and records what happened to them
pub struct FakeLauncher {
    site: SiteSettings,
    script: SiteScript,
    /// Launches that fail before any session exists
    failing_launches: Mutex<u32>,
    launches: Mutex<u32>,
    sessions: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeLauncher {
    pub fn new(site: SiteSettings, script: SiteScript) -> Self {
        Self {
            site,
            script,
            failing_launches: Mutex::new(0),
            launches: Mutex::new(0),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(self, failures: u32) -> Self {
        *self.failing_launches.lock().unwrap() = failures;
        self
    }

    pub fn launches(&self) -> u32 {
        *self.launches.lock().unwrap()
    }

    pub fn all_sessions_closed(&self) -> bool {
        self.sessions.lock().unwrap().iter().all(|closed| closed.load(Ordering::SeqCst))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        *self.launches.lock().unwrap() += 1;

        {
            let mut failing = self.failing_launches.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(CrawlError::Browser("connection refused".to_string()));
            }
        }

        let session = FakeSite::new(self.site.clone(), self.script.clone());
        self.sessions.lock().unwrap().push(session.closed_flag());
        Ok(Box::new(session))
    }
}

#[async_trait]
impl BrowserLauncher for Arc<FakeLauncher> {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        (**self).launch().await
    }
}

use crate::config::{BrowserConfig, Config};
use crate::driver::EokaDriver;
use crate::harvest::{HarvestReport, HarvestSession};
use crate::Result;
use eoka::{Browser, Page};
use tracing::debug;

/// Owns a browser and runs harvests on its page.
pub struct Runner {
    browser: Browser,
    page: Page,
}

impl Runner {
    /// Launch a browser with the given config.
    pub async fn new(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    /// Harvest `config.target.url` on this runner's page.
    pub async fn run(&self, config: &Config) -> Result<HarvestReport> {
        let driver = EokaDriver::new(&self.page);
        HarvestSession::new(&driver, &config.harvest)
            .with_screenshots(config.debug.screenshot_dir.as_deref())
            .run(&config.target.url)
            .await
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

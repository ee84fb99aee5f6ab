//! Browser control for headless validation runs.
//!
//! Real browser control via the Chrome DevTools Protocol, compiled only
//! with the `browser` feature. The rest of the crate depends solely on the
//! [`PageDriver`](crate::page::PageDriver) trait, so swapping the
//! automation product never touches the heuristics.

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 900,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// JavaScript that writes a value into the referenced control and fires
/// the events a reactive page listens for
#[must_use]
pub fn fill_script(target: &crate::selector::ElementRef, text: &str) -> String {
    let value = serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""));
    format!(
        "(() => {{\nconst el = {pick}();\nif (!el) return false;\nif (el.isContentEditable) {{ el.textContent = {value}; }} else {{ el.value = {value}; }}\nel.dispatchEvent(new Event('input', {{ bubbles: true }}));\nel.dispatchEvent(new Event('keyup', {{ bubbles: true }}));\nel.dispatchEvent(new Event('change', {{ bubbles: true }}));\nreturn true;\n}})()",
        pick = target.to_pick_js(),
    )
}

/// JavaScript that clicks the referenced element
#[must_use]
pub fn click_script(target: &crate::selector::ElementRef) -> String {
    format!(
        "(() => {{\nconst el = {pick}();\nif (!el) return false;\nel.click();\nreturn true;\n}})()",
        pick = target.to_pick_js(),
    )
}

#[cfg(feature = "browser")]
mod cdp {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tracing::debug;

    use super::{click_script, fill_script, BrowserConfig};
    use crate::page::{ElementSnapshot, PageDriver};
    use crate::result::{LipiError, LipiResult};
    use crate::selector::{ElementRef, Selector};

    /// A launched browser that hands out one page per scenario
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl std::fmt::Debug for Browser {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Browser")
                .field("config", &self.config)
                .finish_non_exhaustive()
        }
    }

    impl Browser {
        /// Launch a browser instance.
        ///
        /// # Errors
        ///
        /// [`LipiError::BrowserLaunchError`] if the browser cannot start.
        pub async fn launch(config: BrowserConfig) -> LipiResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|e| LipiError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| LipiError::BrowserLaunchError {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a fresh page handle.
        ///
        /// One handle per scenario: handles are never shared because the
        /// target page keeps hidden mutable state.
        pub async fn new_page(&self) -> LipiResult<ChromiumPage> {
            let browser = self.inner.lock().await;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| LipiError::PageError {
                    message: e.to_string(),
                })?;
            Ok(ChromiumPage {
                inner: Arc::new(Mutex::new(page)),
            })
        }

        /// Get the launch configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        pub async fn close(self) -> LipiResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| LipiError::BrowserLaunchError {
                    message: e.to_string(),
                })?;
            Ok(())
        }
    }

    /// One CDP-backed page handle
    pub struct ChromiumPage {
        inner: Arc<Mutex<CdpPage>>,
    }

    impl std::fmt::Debug for ChromiumPage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumPage").finish_non_exhaustive()
        }
    }

    impl ChromiumPage {
        async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> LipiResult<T> {
            let page = self.inner.lock().await;
            let result = page
                .evaluate(script)
                .await
                .map_err(|e| LipiError::PageError {
                    message: e.to_string(),
                })?;
            result.into_value().map_err(|e| LipiError::PageError {
                message: e.to_string(),
            })
        }

        async fn run_action(&self, script: &str, what: &str) -> LipiResult<()> {
            let hit: bool = self.eval(script).await?;
            if hit {
                Ok(())
            } else {
                Err(LipiError::PageError {
                    message: format!("{what} target not found"),
                })
            }
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumPage {
        async fn navigate(&mut self, url: &str) -> LipiResult<()> {
            let page = self.inner.lock().await;
            page.goto(url)
                .await
                .map_err(|e| LipiError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            debug!(url, "navigated");
            Ok(())
        }

        async fn query(&self, selector: &Selector) -> LipiResult<Vec<ElementSnapshot>> {
            self.eval(&selector.to_js()).await
        }

        async fn set_value(&self, target: &ElementRef, text: &str) -> LipiResult<()> {
            self.run_action(&fill_script(target, text), "set_value").await
        }

        async fn clear_value(&self, target: &ElementRef) -> LipiResult<()> {
            self.run_action(&fill_script(target, ""), "clear_value").await
        }

        async fn click(&self, target: &ElementRef) -> LipiResult<()> {
            self.run_action(&click_script(target), "click").await
        }

        async fn evaluate(&self, script: &str) -> LipiResult<serde_json::Value> {
            self.eval(script).await
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, ChromiumPage};

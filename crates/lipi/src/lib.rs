//! Lipi: DOM-heuristic validation of in-browser text transliteration.
//!
//! Lipi drives a third-party, API-less web page through its rendered DOM
//! to validate a transliteration feature, without stable selectors, ids,
//! or any documented contract from the target.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      LIPI Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌─────────────┐    ┌──────────────┐         │
//! │   │ Locator    │───►│ Interaction │───►│ Content      │         │
//! │   │ Resolver   │    │ Driver      │    │ Extractor    │         │
//! │   │ (cascade)  │    │ (state      │    │ (cleaning +  │         │
//! │   │            │    │  machine)   │    │  scoring)    │         │
//! │   └────────────┘    └─────────────┘    └──────────────┘         │
//! │          │                 │                   │                │
//! │          └────────── PageDriver trait ─────────┘                │
//! │              (MockPage | ChromiumPage via CDP)                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver locates the input and output controls through ordered
//! strategy cascades; the extractor isolates the transliterated string
//! from polluted output markup; the scenario driver orchestrates
//! fill → wait → extract → compare for positive, negative, and UI cases.

#![warn(missing_docs)]

pub mod browser;
pub mod config;
pub mod extract;
pub mod page;
pub mod reporter;
pub mod resolver;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod script;
pub mod selector;
pub mod wait;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{Browser, ChromiumPage};
pub use config::HarnessConfig;
pub use extract::{extract, normalize, score_segment, ExtractorConfig};
pub use page::{first_match, ElementSnapshot, MockElement, MockPage, PageDriver};
pub use reporter::{RunSummary, TestStatus};
pub use resolver::{resolve_input, resolve_output, ResolverConfig};
pub use result::{LipiError, LipiResult};
pub use runner::Runner;
pub use scenario::{
    run_scenario, Category, FailureReason, ScenarioReport, ScenarioState, SizeClass, TestCase,
};
pub use script::ScriptRange;
pub use selector::{ElementRef, Selector};
pub use wait::{poll_until, PollOptions};

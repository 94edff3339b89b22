//! Yatube expectation framework
//!
//! Declarative checks of what each kind of visitor sees on each page:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UrlDescriptor                                               │
//! │    ├── url, description, post_data                           │
//! │    ├── guest / authorized / author: { status?, template? }   │
//! │    └── context: [ContextExpectation]                         │
//! │          └── exact | attributes | contains | length | form   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                 │
//! │    ├── one TestClient per Role                               │
//! │    └── run(urls) -> SuiteResult                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  TestClient (in-process, tower oneshot)                      │
//! │    └── TestResponse { status, template, context, ... }       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`TestApp`] wires the real router to an in-memory database with a
//! manual clock so the integration tests under `tests/` run without a
//! network or a wall-clock wait.

pub mod app;
pub mod client;
pub mod error;
pub mod expect;
pub mod runner;
pub mod url;

pub use app::{TestApp, TEST_PASSWORD};
pub use client::{TestClient, TestResponse};
pub use error::{E2eError, E2eResult};
pub use expect::{attrs, AttributeSet, Check, ContextExpectation};
pub use runner::{CaseResult, SuiteResult, SuiteRunner};
pub use url::{FormValue, PostData, Role, RoleExpectation, UrlBuilder, UrlDescriptor};

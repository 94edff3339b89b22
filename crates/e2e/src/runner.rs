//! Role-matrix runner
//!
//! Sends every descriptor's request as each role and checks:
//! 1. the status of the first response;
//! 2. the template of the page reached after following redirects;
//! 3. every context expectation against that final page's context.
//!
//! Each (descriptor, role) case is evaluated on its own; a failing case is
//! recorded and the run carries on.

use std::time::Instant;
use tracing::{error, info};

use crate::client::{TestClient, TestResponse};
use crate::error::{E2eError, E2eResult};
use crate::url::{Role, UrlDescriptor};

/// Outcome of one descriptor checked as one role
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub url: String,
    pub role: Role,
    pub success: bool,
    pub duration_ms: u64,
    pub failures: Vec<String>,
    /// Descriptor parameter dump, for diagnostics
    pub descriptor: String,
}

impl CaseResult {
    pub fn name(&self) -> String {
        format!("{} as {}", self.url, self.role)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<CaseResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Human readable summary of every failing case
    pub fn report(&self) -> String {
        let mut out = format!(
            "{} passed, {} failed ({} ms)\n",
            self.passed, self.failed, self.duration_ms
        );
        for case in self.failures() {
            out.push_str(&format!("\n✗ {}\n", case.name()));
            for failure in &case.failures {
                out.push_str(&format!("    {}\n", failure));
            }
            for line in case.descriptor.lines() {
                out.push_str(&format!("    | {}\n", line));
            }
        }
        out
    }

    /// `Err` listing every failure if any case failed
    pub fn into_result(self) -> E2eResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(E2eError::AssertionFailed(self.report()))
        }
    }
}

/// Runs descriptors against one pre-authenticated client per role
pub struct SuiteRunner {
    guest: TestClient,
    authorized: TestClient,
    author: TestClient,
}

impl SuiteRunner {
    pub fn new(guest: TestClient, authorized: TestClient, author: TestClient) -> Self {
        Self {
            guest,
            authorized,
            author,
        }
    }

    pub fn client(&mut self, role: Role) -> &mut TestClient {
        match role {
            Role::Guest => &mut self.guest,
            Role::Authorized => &mut self.authorized,
            Role::Author => &mut self.author,
        }
    }

    /// Check every descriptor as every role
    pub async fn run(&mut self, urls: &[UrlDescriptor]) -> SuiteResult {
        self.run_roles(urls, &Role::ALL).await
    }

    /// Check every descriptor as each of `roles`
    pub async fn run_roles(&mut self, urls: &[UrlDescriptor], roles: &[Role]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Checking {} url(s) as {} role(s)...", urls.len(), roles.len());

        for url in urls {
            for &role in roles {
                let result = self.check(url, role).await;
                if result.success {
                    passed += 1;
                    info!("✓ {} ({} ms)", result.name(), result.duration_ms);
                } else {
                    failed += 1;
                    error!("✗ {} - {}", result.name(), result.failures.join("; "));
                }
                results.push(result);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Check one descriptor as one role
    pub async fn check(&mut self, url: &UrlDescriptor, role: Role) -> CaseResult {
        let start = Instant::now();
        let failures = match self.exercise(url, role).await {
            Ok(response) => evaluate(url, role, &response),
            Err(e) => vec![e.to_string()],
        };

        CaseResult {
            url: url.url.clone(),
            role,
            success: failures.is_empty(),
            duration_ms: start.elapsed().as_millis() as u64,
            failures,
            descriptor: url.to_string(),
        }
    }

    async fn exercise(&mut self, url: &UrlDescriptor, role: Role) -> E2eResult<TestResponse> {
        let client = self.client(role);
        if url.is_post() {
            client.post_follow(&url.url, &url.post_data).await
        } else {
            client.get_follow(&url.url).await
        }
    }
}

/// Compare a followed response with what `role` should observe
pub fn evaluate(url: &UrlDescriptor, role: Role, response: &TestResponse) -> Vec<String> {
    let expected = url.expected(role);
    let mut failures = Vec::new();

    if let Some(status) = expected.status {
        let actual = response.first_status();
        if actual != status {
            failures.push(format!(
                "status: expected {}, got {}",
                status.as_u16(),
                actual.as_u16()
            ));
        }
    }

    if let Some(template) = &expected.template {
        if response.template.as_deref() != Some(template.as_str()) {
            failures.push(format!(
                "template: expected {}, got {}",
                template,
                response.template.as_deref().unwrap_or("<none>")
            ));
        }
    }

    for expectation in &url.context {
        if let Err(reason) = expectation.evaluate(&response.context) {
            failures.push(reason);
        }
    }

    failures
}

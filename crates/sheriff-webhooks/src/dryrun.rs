//! Dry-run harness for config pull requests.
//!
//! Every opened/synchronized PR against the config repository gets a
//! "Sheriff Dry Run" check: the candidate document is fetched at the merge
//! commit, fed to a reconciler subprocess in dry-run mode, and the captured
//! output is published as an SVG gist embedded in the completed check.
//! Jobs run strictly one at a time through a single-worker FIFO queue.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sheriff_config::{loader, SheriffEnv};
use sheriff_github::client::DynGitHubClient;
use sheriff_github::credentials::CredentialProvider;
use sheriff_github::types::{CheckRunInput, CheckRunOutput};

use crate::ansi;
use crate::error::{WebhookError, WebhookResult};
use crate::events::PullRequestPayload;

/// Check-run name published on head commits.
pub const CHECK_NAME: &str = "Sheriff Dry Run";

/// Mergeability poll attempts and spacing.
const POLL_ATTEMPTS: u32 = 10;
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Program spawned to execute the dry run. Resolved from `PATH`.
const RECONCILER_PROGRAM: &str = "sheriff-cli";

#[derive(Debug)]
struct DryRunJob {
    head_sha: String,
    merge_sha: String,
}

/// Single-worker FIFO harness shared across webhook deliveries.
pub struct DryRunHarness {
    env: SheriffEnv,
    provider: Arc<dyn CredentialProvider>,
    /// Client used for gist uploads; gists need a user token, not the app
    /// installation token.
    gist_client: DynGitHubClient,
    queue: mpsc::UnboundedSender<DryRunJob>,
}

impl DryRunHarness {
    /// Build the harness and spawn its worker. The worker drains the queue
    /// until `shutdown` fires; in-flight jobs complete first.
    pub fn new(
        env: SheriffEnv,
        provider: Arc<dyn CredentialProvider>,
        gist_client: DynGitHubClient,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let harness = Arc::new(Self {
            env,
            provider,
            gist_client,
            queue: tx,
        });
        tokio::spawn(run_worker(Arc::clone(&harness), rx, shutdown));
        harness
    }

    /// Entry point for `pull_request` deliveries.
    pub async fn handle_pull_request(&self, payload: &PullRequestPayload) -> WebhookResult<()> {
        if !matches!(payload.action.as_str(), "opened" | "synchronize") {
            return Ok(());
        }
        if !self
            .env
            .is_config_repo(&payload.repository.owner.login, &payload.repository.name)
        {
            return Ok(());
        }

        let head_sha = payload.pull_request.head.sha.clone();
        let client = self.org_client().await?;

        let Some(merge_sha) = self.poll_merge_sha(&client, payload.number).await? else {
            self.post_check(
                &client,
                &head_sha,
                Some("failure"),
                "No merge sha available",
                None,
            )
            .await?;
            return Ok(());
        };

        self.post_in_progress(&client, &head_sha).await?;

        self.queue
            .send(DryRunJob { head_sha, merge_sha })
            .map_err(|_| WebhookError::Harness("dry-run queue is closed".to_string()))?;
        Ok(())
    }

    async fn org_client(&self) -> WebhookResult<DynGitHubClient> {
        Ok(self
            .provider
            .client_for_org(&self.env.permissions_file_org, false)
            .await?)
    }

    /// Poll the PR until its mergeability is computed; return the merge sha.
    async fn poll_merge_sha(
        &self,
        client: &DynGitHubClient,
        number: u64,
    ) -> WebhookResult<Option<String>> {
        for attempt in 0..POLL_ATTEMPTS {
            let pr = client
                .get_pull_request(
                    &self.env.permissions_file_org,
                    &self.env.permissions_file_repo,
                    number,
                )
                .await?;
            let known = pr
                .mergeable_state
                .as_deref()
                .is_some_and(|state| state != "unknown");
            if known {
                return Ok(pr.merge_commit_sha);
            }
            if attempt + 1 < POLL_ATTEMPTS {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
        Ok(None)
    }

    async fn post_in_progress(
        &self,
        client: &DynGitHubClient,
        head_sha: &str,
    ) -> WebhookResult<()> {
        let check = CheckRunInput {
            name: CHECK_NAME.to_string(),
            head_sha: head_sha.to_string(),
            status: "in_progress".to_string(),
            conclusion: None,
            output: None,
        };
        client
            .create_check_run(
                &self.env.permissions_file_org,
                &self.env.permissions_file_repo,
                &check,
            )
            .await?;
        Ok(())
    }

    async fn post_check(
        &self,
        client: &DynGitHubClient,
        head_sha: &str,
        conclusion: Option<&str>,
        summary: &str,
        text: Option<String>,
    ) -> WebhookResult<()> {
        let check = CheckRunInput {
            name: CHECK_NAME.to_string(),
            head_sha: head_sha.to_string(),
            status: "completed".to_string(),
            conclusion: conclusion.map(str::to_string),
            output: Some(CheckRunOutput {
                title: CHECK_NAME.to_string(),
                summary: summary.to_string(),
                text,
            }),
        };
        client
            .create_check_run(
                &self.env.permissions_file_org,
                &self.env.permissions_file_repo,
                &check,
            )
            .await?;
        Ok(())
    }

    /// Execute one queued job end to end.
    async fn run_job(&self, job: &DryRunJob) -> WebhookResult<()> {
        let client = self.org_client().await?;

        let config_path = self.write_candidate_config(&client, job).await?;
        let (success, output) = self.spawn_reconciler(&config_path).await?;

        let svg = ansi::render_svg(&output);
        let gist = self.gist_client.create_gist("sheriff-dry-run.svg", &svg).await?;

        let conclusion = if success { "success" } else { "failure" };
        self.post_check(
            &client,
            &job.head_sha,
            Some(conclusion),
            "Dry run output",
            Some(format!("<img src=\"{}\" width=\"800\" />", gist.raw_url)),
        )
        .await
    }

    /// Fetch the candidate config at the merge commit and write it to the
    /// per-job temp path.
    async fn write_candidate_config(
        &self,
        client: &DynGitHubClient,
        job: &DryRunJob,
    ) -> WebhookResult<PathBuf> {
        let file = client
            .get_file_content(
                &self.env.permissions_file_org,
                &self.env.permissions_file_repo,
                &self.env.permissions_file_path,
                &job.merge_sha,
            )
            .await?;
        let raw = loader::decode_content(&file.content, &file.encoding)?;

        let path = std::env::temp_dir().join(format!(
            "sheriff-{}-{}.yaml",
            job.merge_sha, job.head_sha
        ));
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| WebhookError::Harness(format!("cannot write candidate config: {e}")))?;
        Ok(path)
    }

    /// Run the reconciler CLI against the candidate config, dry-run on and
    /// color forced, returning exit success and combined output.
    async fn spawn_reconciler(&self, config_path: &std::path::Path) -> WebhookResult<(bool, String)> {
        let output = tokio::process::Command::new(RECONCILER_PROGRAM)
            .arg("reconcile")
            .env("PERMISSIONS_FILE_LOCAL_PATH", config_path)
            .env("CLICOLOR_FORCE", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| WebhookError::Harness(format!("cannot spawn reconciler: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok((output.status.success(), combined))
    }
}

/// Worker loop: strictly one job at a time, in enqueue order. A crashed job
/// records its failure check and the worker moves on.
async fn run_worker(
    harness: Arc<DryRunHarness>,
    mut rx: mpsc::UnboundedReceiver<DryRunJob>,
    shutdown: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("dry-run worker shutting down");
                break;
            }
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        tracing::info!(head = %job.head_sha, merge = %job.merge_sha, "running dry run");
        if let Err(err) = harness.run_job(&job).await {
            tracing::error!(head = %job.head_sha, error = %err, "dry run failed");
            if let Ok(client) = harness.org_client().await {
                let result = harness
                    .post_check(
                        &client,
                        &job.head_sha,
                        Some("action_required"),
                        "Something went wrong",
                        None,
                    )
                    .await;
                if let Err(err) = result {
                    tracing::error!(error = %err, "could not record dry-run failure check");
                }
            }
        }
    }
}

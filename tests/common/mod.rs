#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

/// A running server binary owned by one test. Dropping it kills the process.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Memory-backed development server so each test starts from empty collections
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_job-portal-api"));
        cmd.env("PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("ACCESS_TOKEN_SECRET", "integration-test-secret")
            .env_remove("DATABASE_URL")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// POST /jwt and return the `name=value` pair from Set-Cookie, ready for a Cookie header.
pub async fn login(server: &TestServer, email: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(server.url("/jwt"))
        .json(&json!({ "email": email }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "jwt failed: {}", res.status());

    let set_cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .context("no Set-Cookie header")?
        .to_str()?
        .to_string();
    let pair = set_cookie.split(';').next().unwrap_or_default().trim().to_string();
    Ok(pair)
}

/// POST a job and return its id
pub async fn create_job(server: &TestServer, job: Value) -> Result<String> {
    let body: Value = reqwest::Client::new()
        .post(server.url("/jobs"))
        .json(&job)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    body["insertedId"].as_str().map(str::to_owned).context("missing insertedId")
}

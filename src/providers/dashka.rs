//! Dashka provider variant (technical support desk).
//!
//! Runs either as a self-contained mock that answers common infrastructure
//! questions from canned templates, or against a real support API. The real
//! API integration is a stub: the endpoint was never deployed, so api mode
//! reports NotAvailable.

use crate::config::{DashkaMode, DashkaSettings};
use crate::providers::provider::{AiProvider, ProbeState};
use crate::providers::types::{CallParams, ProviderId, ResponseEnvelope, ResponseStatus};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

const MOCK_LATENCY: Duration = Duration::from_millis(500);

pub struct DashkaProvider {
    settings: DashkaSettings,
    probe_state: ProbeState,
}

impl DashkaProvider {
    pub fn new(settings: DashkaSettings) -> Self {
        match settings.mode {
            DashkaMode::Mock => info!("dashka provider initialized in mock mode"),
            DashkaMode::Api => info!("dashka provider initialized in api mode"),
        }
        Self { settings, probe_state: ProbeState::default() }
    }

    async fn process_mock(&self, query: &str) -> ResponseEnvelope {
        let start = Instant::now();
        // Simulated backend latency.
        tokio::time::sleep(MOCK_LATENCY).await;

        let query_lower = query.to_lowercase();
        let (content, priority, category) = if ["server", "service down", "not responding", "crash"]
            .iter()
            .any(|kw| query_lower.contains(kw))
        {
            (server_response(), "high", "server")
        } else if ["database", "db", "sql", "postgres"].iter().any(|kw| query_lower.contains(kw)) {
            (database_response(), "normal", "database")
        } else if ["docker", "container", "image"].iter().any(|kw| query_lower.contains(kw)) {
            (docker_response(), "normal", "docker")
        } else {
            (general_response(), "normal", "general")
        };

        let mut metadata = HashMap::new();
        metadata.insert("priority".to_string(), json!(priority));
        metadata.insert("category".to_string(), json!(category));
        metadata.insert("mode".to_string(), json!("mock"));

        ResponseEnvelope {
            tokens_used: content.split_whitespace().count() as u64,
            content: content.to_string(),
            provider: Some(ProviderId::Dashka),
            status: ResponseStatus::Success,
            execution_time: start.elapsed().as_secs_f64(),
            cost: 0.0,
            model: "dashka-mock".to_string(),
            confidence: 0.0,
            suggestions: Vec::new(),
            metadata,
            timestamp: Utc::now(),
        }
    }

    fn process_api(&self, start: Instant) -> ResponseEnvelope {
        // TODO(api mode): wire up the real support endpoint once it exists.
        ResponseEnvelope::provider_failure(
            ProviderId::Dashka,
            ResponseStatus::NotAvailable,
            "Dashka api mode is not deployed yet; use mock mode",
            start.elapsed().as_secs_f64(),
        )
    }
}

#[async_trait::async_trait]
impl AiProvider for DashkaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Dashka
    }

    async fn probe_availability(&self) -> bool {
        let ok = match self.settings.mode {
            DashkaMode::Mock => true,
            DashkaMode::Api => self.settings.api_key.is_some(),
        };
        self.probe_state.record_probe(ok);
        ok
    }

    async fn process(&self, query: &str, _params: &CallParams) -> ResponseEnvelope {
        match self.settings.mode {
            DashkaMode::Mock => self.process_mock(query).await,
            DashkaMode::Api => self.process_api(Instant::now()),
        }
    }
}

fn server_response() -> &'static str {
    "**Server problem diagnostics:**\n\n\
     First checks:\n\
     1. Process status: `ps aux | grep your_app`\n\
     2. Application logs: `tail -f /var/log/app.log`\n\
     3. Listening ports: `netstat -tulpn | grep :8080`\n\n\
     Likely causes:\n\
     • Exhausted CPU or memory\n\
     • Network connectivity issues\n\
     • Configuration errors\n\
     • Full disk\n\n\
     I recommend restarting the service (`systemctl restart your_app`), checking free \
     space with `df -h` and watching resources with `htop`."
}

fn database_response() -> &'static str {
    "**Database problem diagnostics:**\n\n\
     Connection checks:\n\
     1. Connectivity test: `pg_isready -h localhost -p 5432`\n\
     2. Process check: `ps aux | grep postgres`\n\
     3. Logs: `tail -f /var/log/postgresql/postgresql.log`\n\n\
     Frequent causes:\n\
     • Connection limit exceeded\n\
     • Blocked transactions\n\
     • No free disk space\n\
     • Wrong access privileges\n\n\
     I suggest restarting with `systemctl restart postgresql` and inspecting locks via \
     `SELECT * FROM pg_locks;`."
}

fn docker_response() -> &'static str {
    "**Docker problem diagnostics:**\n\n\
     Basic checks:\n\
     1. Daemon status: `systemctl status docker`\n\
     2. Container list: `docker ps -a`\n\
     3. Container logs: `docker logs container_name`\n\n\
     Frequent causes:\n\
     • No space left for images\n\
     • Docker network issues\n\
     • Dockerfile errors\n\
     • Port conflicts\n\n\
     I recommend `docker system prune -a` for cleanup and `docker build --no-cache .` \
     for a clean rebuild."
}

fn general_response() -> &'static str {
    "**General technical support:**\n\n\
     Standard diagnostic steps:\n\
     1. Reproduce the problem\n\
     2. Collect logs and metrics\n\
     3. Review recent changes\n\
     4. Check system resources\n\n\
     Useful commands:\n\
     • Resources: `top`, `htop`, `iotop`\n\
     • System logs: `journalctl -f`\n\
     • Network connections: `netstat -an`\n\
     • Disk usage: `df -h`\n\n\
     Please provide reproduction steps and any relevant logs for deeper analysis."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DashkaMode, DashkaSettings};

    fn mock_provider() -> DashkaProvider {
        DashkaProvider::new(DashkaSettings::default())
    }

    #[tokio::test]
    async fn mock_mode_is_always_available() {
        let provider = mock_provider();
        assert!(provider.probe_availability().await);
    }

    #[tokio::test]
    async fn api_mode_without_key_is_unavailable() {
        let provider = DashkaProvider::new(DashkaSettings {
            mode: DashkaMode::Api,
            ..DashkaSettings::default()
        });
        assert!(!provider.probe_availability().await);

        let envelope = provider.process("help", &CallParams::default()).await;
        assert_eq!(envelope.status, ResponseStatus::NotAvailable);
    }

    #[tokio::test]
    async fn mock_routes_server_questions() {
        let provider = mock_provider();
        let envelope = provider
            .process("the server is not responding after deploy", &CallParams::default())
            .await;
        assert!(envelope.is_success());
        assert_eq!(envelope.metadata["category"], json!("server"));
        assert_eq!(envelope.metadata["priority"], json!("high"));
        assert_eq!(envelope.model, "dashka-mock");
        assert_eq!(envelope.cost, 0.0);
        assert_eq!(envelope.tokens_used, envelope.content.split_whitespace().count() as u64);
    }

    #[tokio::test]
    async fn mock_falls_back_to_general_support() {
        let provider = mock_provider();
        let envelope = provider.process("my printer smells weird", &CallParams::default()).await;
        assert!(envelope.is_success());
        assert_eq!(envelope.metadata["category"], json!("general"));
    }
}

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use log_pusher::{
    Client, Config, JsonFormatter, LabelSet, Push, PushError, PushLogger, PushRequest,
    RESERVED_LABEL_TENANT_ID,
};

/// Prints every push request as JSON instead of sending it
struct StdoutPusher;

#[async_trait]
impl Push for StdoutPusher {
    async fn push(&self, tenant_id: &str, request: &PushRequest) -> Result<(), PushError> {
        let body =
            serde_json::to_string(request).map_err(|e| PushError::Transport(e.to_string()))?;
        println!("tenant={:?} {}", tenant_id, body);
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> log_pusher::Result<()> {
    println!("Running stdout push example");

    let config = Config::from_yaml_str(
        r#"
server_address: localhost:9095
batch_wait: 500ms
batch_size: 256
tenant_id: demo
external_labels:
  host: laptop
"#,
    )?;
    let client = Client::builder(config).build(StdoutPusher)?;

    PushLogger::new(client.entry_sender())
        .with_label("app", "stdout_push")
        .with_formatter(JsonFormatter)
        .init()?;

    for i in 0..20 {
        log::info!(attempt = i; "Line no: {}", i);
        let labels = LabelSet::new().with_label("job", "worker");
        let labels = if i % 5 == 0 {
            labels.with_label(RESERVED_LABEL_TENANT_ID, "audit")
        } else {
            labels
        };
        client.handle(labels, SystemTime::now(), &format!("worker tick {}", i))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    client.stop().await
}

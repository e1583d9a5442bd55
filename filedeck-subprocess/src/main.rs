use std::env;

use filedeck_subprocess::run_subprocess;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut settings_path: Option<String> = None;
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--settings-path" {
            i += 1;
            if i < args.len() {
                settings_path = Some(args[i].clone());
            }
        }
        i += 1;
    }

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run_subprocess(settings_path).await
}

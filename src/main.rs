//! Control CLI for the local inference worker supervisor.
//!
//! Usage:
//!   local_vlm_ctl check <model-id>
//!   local_vlm_ctl run <image> [model-id] [prompt...]
//!
//! `run` drives the full lifecycle once: availability check, start, one
//! inference, status print, stop. Worker selection comes from the
//! `LOCAL_VLM_WORKER` environment variable (program plus arguments).

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use local_vlm::{
    global, install_global, InferRequest, ProcessSupervisor, WorkerConfig, DEFAULT_MODEL,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    install_global(Arc::new(ProcessSupervisor::from_env()));
    let supervisor = global().context("supervisor not installed")?;

    match args.first().map(String::as_str) {
        Some("check") => {
            let model_id = args.get(1).map_or(DEFAULT_MODEL, String::as_str);
            let availability = supervisor.check_availability(model_id).await?;
            println!(
                "installed={} message={}",
                availability.installed, availability.message
            );
            if !availability.installed {
                std::process::exit(1);
            }
        }
        Some("run") => {
            let Some(image) = args.get(1) else {
                bail!("usage: local_vlm_ctl run <image> [model-id] [prompt...]");
            };
            let model_id = args.get(2).map_or(DEFAULT_MODEL, String::as_str);
            let prompt = if args.len() > 3 {
                args[3..].join(" ")
            } else {
                "Extract every printed field from this scan as JSON.".to_string()
            };

            let state = supervisor.start(WorkerConfig::new(model_id)).await?;
            println!("worker: {:?} (pid={:?})", state.status, state.pid);

            let timeout = supervisor.settings().request_timeout;
            let result = supervisor
                .submit(InferRequest::new(image.clone(), prompt), timeout)
                .await;
            match result {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(err) => {
                    eprintln!("inference failed: {err}");
                    if let Some(snapshot) = supervisor.last_exit() {
                        eprintln!("last exit: code={:?} signal={:?}", snapshot.code, snapshot.signal);
                        for line in snapshot.stderr_tail {
                            eprintln!("  {line}");
                        }
                    }
                }
            }

            let state = supervisor.stop().await;
            println!(
                "worker: {:?} — {} ({} pending)",
                state.status,
                state.message,
                supervisor.pending_requests()
            );
        }
        _ => {
            bail!("usage: local_vlm_ctl <check|run> ...");
        }
    }
    Ok(())
}

use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn main() -> std::process::ExitCode {
    dotenv().ok();

    // Config errors are reported again (and fatally) by `server::run`.
    let cfg = configs::AppConfig::load_or_env().ok();
    common::utils::logging::init_logging(cfg.as_ref().map(|c| c.server.json_logs).unwrap_or(false));
    let worker_threads = cfg.as_ref().and_then(|c| c.server.worker_threads);

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "booking", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "booking", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(service = "booking", event = "start", %service_id, pid, version, threads = worker_threads.unwrap_or_default(), "booking server starting");

    // `server::run` owns graceful shutdown on ctrl-c.
    rt.block_on(async move {
        match server::run().await {
            Ok(()) => {
                info!(service = "booking", event = "stop", %service_id, pid, "server stopped normally");
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "booking", event = "run_failed", error = %e, "server::run returned error");
                std::process::ExitCode::FAILURE
            }
        }
    })
}

// src/main.rs

use flowguard::cli::{Invocation, usage_text};
use flowguard::errors::AgentError;
use flowguard::{config, logging, run};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let code = match run_main(args.clone()).await {
        Ok(code) => code,
        Err(err) if err.is_usage() => {
            eprint!("{}", usage_text(&err.to_string(), &args));
            1
        }
        Err(err) => {
            eprintln!("flowguard error: {err:?}");
            1
        }
    };
    std::process::exit(code);
}

async fn run_main(args: Vec<String>) -> Result<i32, AgentError> {
    // Resolves our own path, so this must come before any chdir.
    let invocation = Invocation::parse(args)?;
    let settings = config::load_settings(&invocation.exe_path)?;
    logging::init_logging(settings.log_level.as_deref())?;
    run(invocation, settings).await
}

// src/main.rs

use rcopy::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("rcopy error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    Ok(run(args).await?)
}

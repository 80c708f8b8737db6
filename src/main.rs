//! # R2 Credentials Controller
//!
//! A Kubernetes controller that issues Cloudflare API tokens scoped to R2
//! object access and publishes them as S3-compatible connection secrets.
//!
//! ## Overview
//!
//! For every `Credentials` resource the controller:
//!
//! 1. **Resolves credentials** - Reads the Cloudflare API token from the referenced `ProviderConfig`
//! 2. **Issues a token** - Creates a token limited to R2 object read and/or write on one bucket or account
//! 3. **Publishes a secret** - Writes `access_key_id`, `secret_access_key`, `endpoint` and `token_value`
//! 4. **Revokes on delete** - Deletes the token when the resource is deleted (unless orphaned)
//!
//! ## Usage
//!
//! ```bash
//! r2-credentials-controller --poll 1m --max-reconcile-rate 10
//! ```

use anyhow::Result;
use clap::Parser;
use r2_credentials_controller::runtime::{initialize, run_watch_loop, RuntimeOptions};

#[derive(Debug, Parser)]
#[command(name = "r2-credentials-controller")]
#[command(about = "Cloudflare R2 credentials controller", long_about = None)]
struct Cli {
    /// Run with debug logging
    #[arg(short, long, env = "DEBUG")]
    debug: bool,

    /// How often individual resources are checked for drift
    #[arg(long, env = "POLL_INTERVAL", default_value = "1m")]
    poll: String,

    /// Global reconciles per second; also the concurrency of each controller
    #[arg(long, env = "MAX_RECONCILE_RATE", default_value_t = 10)]
    max_reconcile_rate: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = RuntimeOptions {
        debug: cli.debug,
        poll: Some(cli.poll),
        max_reconcile_rate: Some(cli.max_reconcile_rate),
    };

    let init_result = initialize(&options).await?;
    run_watch_loop(init_result).await
}

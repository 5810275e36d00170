// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::Parser;
use proxmox_gateway::application::Application;
use proxmox_gateway::configuration::GatewayOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("[gateway] init");

    // a missing .env file is fine, the environment may already be populated
    let _ = dotenvy::dotenv();

    // get configuration options from flags and environment variables
    let options = GatewayOptions::parse();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&options.log_level)),
        )
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        .with_ansi(false)
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    tracing::info!("[gateway] {:?}", &options);

    let application = Application::build(options).await?;

    tracing::debug!("[gateway] serving on port {}", application.port());

    application.run_until_stopped().await?;

    Ok(())
}

use clap::Parser;
use thinking_mcp_server::Cli;
use thinking_mcp_server::ServerConfig;
use thinking_mcp_server::run_main;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::from_cli(&cli);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_main(config));
    // A blocking stdin read may still be parked after Ctrl-C; do not wait on it.
    runtime.shutdown_background();
    result
}

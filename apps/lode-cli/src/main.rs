use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = lode_cli::Args::parse();
	lode_cli::run(args).await
}

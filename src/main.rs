use rustaccio_azure_ad::{
    config::Config,
    runtime::run_standalone,
};
use std::path::PathBuf;

const USAGE: &str = "\
Usage: rustaccio-azure-ad [OPTIONS]

Serves Azure AD login and group-based package permissions over the
Rustaccio HTTP auth plugin protocol.

Options:
  -c, --config <path>  Path to YAML config with an auth.azure-ad section
      --check          Validate configuration and exit
  -h, --help           Print help

Environment:
  RUSTACCIO_AZURE_TENANT, RUSTACCIO_AZURE_CLIENT_ID, RUSTACCIO_AZURE_CLIENT_SECRET,
  RUSTACCIO_AZURE_ALLOW_GROUPS, RUSTACCIO_AZURE_ORGANIZATION_DOMAIN, RUSTACCIO_AZURE_SCOPE
";

#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    config_path: Option<PathBuf>,
    check: bool,
    help: bool,
}

fn parse_cli_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => options.help = true,
            "--check" => options.check = true,
            "-c" | "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --config".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            _ => match arg.strip_prefix("--config=") {
                Some("") => return Err("missing value for --config".to_string()),
                Some(value) => options.config_path = Some(PathBuf::from(value)),
                None => return Err(format!("unknown argument: {arg}")),
            },
        }
    }
    Ok(options)
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config, String> {
    match config_path {
        Some(path) => Config::from_env_with_config_file(path),
        None => Config::from_env(),
    }
}

#[tokio::main]
async fn main() {
    let options = match parse_cli_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    if options.help {
        println!("{USAGE}");
        return;
    }

    let config = match load_config(options.config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    if options.check {
        println!(
            "configuration ok: tenant={} bind={} allow_groups={}",
            config.azure.tenant,
            config.bind,
            config.azure.allow_groups.len()
        );
        return;
    }

    if let Err(err) = run_standalone(config).await {
        eprintln!("azure ad auth server error: {err}");
        std::process::exit(1);
    }
}

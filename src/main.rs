// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use ontap_probe::config::{ApiVersion, AuthStyle, ProbeSettings, Transport, ENV_PROBE_CONFIG};
use ontap_probe::probe::{self, ProbeOutcome, EXIT_FAULT};
use ontap_probe::runtime::{init_logging, LogLevel};
use ontap_probe::{OntapConnector, ProbeConfig};

#[derive(Parser, Debug)]
#[command(
    name = "ontap-probe",
    version,
    about = "Query an ONTAP cluster's version over the management API"
)]
struct Cli {
    /// YAML settings file
    #[arg(short, long, env = ENV_PROBE_CONFIG)]
    config: Option<PathBuf>,

    /// Cluster management host name or address
    #[arg(long, env = "ONTAP_CLUSTER")]
    cluster: Option<String>,

    /// HTTPS or HTTP
    #[arg(long, env = "ONTAP_TRANSPORT")]
    transport: Option<Transport>,

    /// Port (default: 443 for HTTPS, 80 for HTTP)
    #[arg(long, env = "ONTAP_PORT")]
    port: Option<u16>,

    /// CERTIFICATE or LOGIN
    #[arg(long, env = "ONTAP_STYLE")]
    style: Option<AuthStyle>,

    /// Client certificate (PEM)
    #[arg(long, env = "ONTAP_CERT")]
    cert: Option<PathBuf>,

    /// Client private key (PEM)
    #[arg(long, env = "ONTAP_KEY")]
    key: Option<PathBuf>,

    /// CA bundle for server verification (PEM)
    #[arg(long, env = "ONTAP_CA")]
    ca: Option<PathBuf>,

    /// Verify the server certificate (off unless set)
    #[arg(
        long,
        env = "ONTAP_VERIFY_SERVER_CERT",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    verify_server_cert: Option<bool>,

    /// User name for LOGIN style
    #[arg(long, env = "ONTAP_USER")]
    user: Option<String>,

    /// Password for LOGIN style
    #[arg(long, env = "ONTAP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// API version as MAJOR.MINOR (default: 1.30)
    #[arg(long)]
    api_version: Option<ApiVersion>,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log level on stderr; overrides -v and RUST_LOG
    #[arg(long, env = "ONTAP_PROBE_LOG")]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn log_level(&self) -> Option<LogLevel> {
        self.log_level
            .or_else(|| (self.verbose > 0).then(|| LogLevel::from_verbosity(self.verbose)))
    }

    fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            cluster: self.cluster.clone(),
            transport: self.transport,
            port: self.port,
            style: self.style,
            cert: self.cert.clone(),
            key: self.key.clone(),
            ca: self.ca.clone(),
            verify_server_cert: self.verify_server_cert,
            user: self.user.clone(),
            password: self.password.clone(),
            api_version: self.api_version,
        }
    }

    fn resolve(&self) -> ontap_probe::error::Result<ProbeConfig> {
        let file = ProbeSettings::load_layer(self.config.as_deref())?;
        file.merge(self.settings()).resolve()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Keep 2 reserved for a failed remote call.
            return if e.use_stderr() {
                ExitCode::from(EXIT_FAULT)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.log_level());

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_FAULT);
        }
    };

    let outcome = probe::run(&OntapConnector, &config).await;

    if let Some(line) = outcome.stdout_line() {
        println!("{line}");
    }
    if let ProbeOutcome::Fault(e) = &outcome {
        error!(kind = e.kind(), error = %e, "probe failed");
    }

    ExitCode::from(outcome.exit_code())
}

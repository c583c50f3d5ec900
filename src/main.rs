use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use rcom_link::{app, LinkLayer, LinkParams, Role};

/// Transfers a file over a serial link using a stop-and-wait data link
/// protocol.
#[derive(Debug, Parser)]
#[command(name = "rcom-link", version, about)]
struct Cli {
    /// Serial device to use, e.g. /dev/ttyS0.
    #[arg(long = "port")]
    serial_port: String,

    /// Role this side plays on the link.
    #[arg(long, value_enum)]
    role: CliRole,

    /// Baud rate.
    #[arg(long, default_value_t = rcom_link::config::DEFAULT_BAUD)]
    baud: u32,

    /// Maximum number of retransmissions per retryable send.
    #[arg(long = "retries", default_value_t = rcom_link::config::DEFAULT_RETRANSMISSIONS)]
    n_retransmissions: u8,

    /// Per-attempt timeout, in seconds.
    #[arg(long, default_value_t = 3)]
    timeout: u64,

    /// File to send (Tx) or path to write the received file to (Rx).
    #[arg(long = "file")]
    file: PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliRole {
    Tx,
    Rx,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::Tx => Role::Tx,
            CliRole::Rx => Role::Rx,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let params = LinkParams::new(&cli.serial_port, cli.role.into())
        .baud(cli.baud)
        .retransmissions(cli.n_retransmissions)
        .timeout(Duration::from_secs(cli.timeout));

    if let Err(e) = run(params, cli.role.into(), &cli.file) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(params: LinkParams, role: Role, file: &std::path::Path) -> rcom_link::Result<()> {
    let mut link = LinkLayer::open(params)?;

    let result = match role {
        Role::Tx => app::send_file(&mut link, file),
        Role::Rx => app::receive_file(&mut link, file),
    };

    // Close is attempted even if the transfer itself failed.
    let close_result = link.close(true);
    result?;
    close_result?;
    Ok(())
}

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::Parser;
use reolink_dl::batch::BatchEvent;
use reolink_dl::constants::{DOWNLOAD_PACING, HTTPS_PORT};
use reolink_dl::protocol::parse_timestamp;
use reolink_dl::report::status_lines;
use reolink_dl::{
    BatchOptions, BatchOutcome, Credentials, ReolinkCam, ReolinkError, Scheme, TimeWindow,
    run_batch,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Download Reolink camera recordings within a time range.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Camera IP address or host name.
    #[arg(long)]
    ip: String,

    /// Camera username.
    #[arg(long)]
    username: String,

    /// Camera password.
    #[arg(long, env = "REOLINK_PASSWORD", hide_env_values = true)]
    password: String,

    /// Camera HTTPS port.
    #[arg(long, default_value_t = HTTPS_PORT)]
    port: u16,

    /// Start of the search window (YYYY-MM-DD HH:MM:SS).
    #[arg(long, value_parser = parse_timestamp)]
    start: NaiveDateTime,

    /// End of the search window (YYYY-MM-DD HH:MM:SS).
    #[arg(long, value_parser = parse_timestamp)]
    end: NaiveDateTime,

    /// Output directory.
    #[arg(long, default_value = "./recordings")]
    output: PathBuf,

    /// Camera channel.
    #[arg(long, default_value_t = 0)]
    channel: u8,

    /// Only list recordings, do not download.
    #[arg(long)]
    list_only: bool,

    /// Delay between downloads, in milliseconds.
    #[arg(long, default_value_t = DOWNLOAD_PACING.as_millis() as u64)]
    delay_ms: u64,

    /// Talk plain HTTP instead of HTTPS.
    #[arg(long, hide = true)]
    insecure_http: bool,
}

fn print_event(event: BatchEvent<'_>) {
    for line in status_lines(&event) {
        println!("{}", line);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let window = TimeWindow::new(args.start, args.end)?;

    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("Cannot create output directory {}", args.output.display()))?;

    let credentials = Credentials {
        host: args.ip,
        port: args.port,
        username: args.username,
        password: args.password,
    };

    let mut cam = ReolinkCam::from_credentials(&credentials)?;
    if args.insecure_http {
        cam = cam.with_scheme(Scheme::Http);
    }

    let options = BatchOptions {
        channel: args.channel,
        window,
        output_dir: args.output,
        list_only: args.list_only,
        pacing: Duration::from_millis(args.delay_ms),
    };

    let outcome = run_batch(
        &cam,
        &credentials.username,
        &credentials.password,
        &options,
        &print_event,
    )
    .await;

    match outcome {
        Err(ReolinkError::AuthenticationError(reason)) => {
            println!("Authentication failed: {}", reason);
            println!("Failed to authenticate with camera");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
        Ok(BatchOutcome::NoRecordings) => {
            println!("No recordings found");
            Ok(ExitCode::SUCCESS)
        }
        Ok(BatchOutcome::SearchFailed { reason }) => {
            println!("Search failed: {}", reason);
            println!("No recordings found");
            Ok(ExitCode::SUCCESS)
        }
        Ok(BatchOutcome::Listed { recordings, .. }) => {
            println!();
            println!("Listed {} recordings, download skipped.", recordings);
            Ok(ExitCode::SUCCESS)
        }
        Ok(BatchOutcome::Downloaded(summary)) => {
            println!();
            if summary.skipped > 0 {
                println!("Skipped {} recordings without a filename.", summary.skipped);
            }
            println!("Download complete. {}.", summary);
            Ok(ExitCode::SUCCESS)
        }
    }
}

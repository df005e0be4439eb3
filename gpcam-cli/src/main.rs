mod network;
mod progress;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gpcam_lib::wifi::NetworkJoin;
use gpcam_lib::{Camera, DEFAULT_ATTEMPTS, MediaClient, RetryEvent, retry};

use crate::network::NmcliJoin;
use crate::progress::ProgressRenderer;

/// Offload a GoPro's media over BLE + Wi-Fi, then put it back to sleep.
#[derive(Debug, Parser)]
#[command(name = "gpcam")]
struct Args {
    /// Last 4 characters of the camera serial number
    #[arg(short, long)]
    id: Option<String>,

    /// Output folder (defaults to output/<camera id>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also re-download files that already exist locally
    #[arg(short, long)]
    all: bool,

    /// Wi-Fi interface to join the camera's access point with
    #[arg(short, long)]
    wifi: Option<String>,
}

/// Renders the retry indicator as an updating single line on stderr, cleared
/// when the wrapped operation settles.
fn retry_status() -> impl FnMut(RetryEvent) {
    |event| {
        match event {
            RetryEvent::Failed {
                attempt,
                max_attempts,
            } => {
                eprint!("\r\x1b[2K\x1b[31mFailed.\x1b[0m Retrying ({attempt}/{max_attempts})...");
            }
            RetryEvent::Settled => {
                eprint!("\r\x1b[2K");
            }
        }
        let _ = io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("Connecting BLE...");
    let mut camera = retry(
        || Camera::connect(args.id.as_deref()),
        DEFAULT_ATTEMPTS,
        retry_status(),
    )
    .await?;

    let info = camera.info().await?;
    let camera_id = info
        .serial
        .get(info.serial.len().saturating_sub(4)..)
        .unwrap_or(&info.serial)
        .to_string();
    println!("[{camera_id}] {}", info.name);

    println!("Enabling AP...");
    let credentials = retry(|| camera.enable_ap(), DEFAULT_ATTEMPTS, retry_status()).await?;

    println!("Connecting Wi-Fi...");
    let network = NmcliJoin::new();
    retry(
        || {
            network.connect(
                args.wifi.as_deref(),
                &credentials.ssid,
                &credentials.password,
            )
        },
        DEFAULT_ATTEMPTS,
        retry_status(),
    )
    .await?;

    println!("Listing media...");
    let http = MediaClient::new();
    retry(|| http.turbo_transfer(true), DEFAULT_ATTEMPTS, retry_status()).await?;
    let mut media = retry(|| http.list(), DEFAULT_ATTEMPTS, retry_status()).await?;
    println!("{} files on camera", media.len());

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("output").join(&camera_id));
    std::fs::create_dir_all(&output).with_context(|| format!("creating {}", output.display()))?;

    if !args.all {
        media.retain(|file| !output.join(&file.name).exists());
    }

    if media.is_empty() {
        println!("No new files on camera.");
    } else {
        println!("Downloading {} files to:", media.len());
        println!("{}", output.display());
        let mut progress = ProgressRenderer::new(&media);
        http.download(&media, &output, &mut progress).await?;
        progress.finish();
    }

    println!("Shutting down...");
    http.turbo_transfer(false).await?;
    network.disconnect().await?;
    camera.disable_ap().await?;
    camera.set_clock().await?;
    camera.sleep().await?;
    camera.disconnect().await?;

    println!("Done!");
    Ok(())
}

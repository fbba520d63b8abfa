//! enclavesign - host shell for the device key signer
//!
//! Reads one JSON call per line on stdin and writes one JSON reply per line
//! on stdout:
//!
//! ```text
//! {"method":"generateKeypair","arguments":{"rp_id":"bank.example"}}
//! {"ok":true,"result":"MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE..."}
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`). Keys live in the
//! in-process software store and are gone when the process exits.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use log::{debug, info, warn};

use enclavesign::entropy::SystemRng;
use enclavesign::identifier::DEFAULT_NAMESPACE;
use enclavesign::{Dispatcher, SignerConfig, SigningService, SoftwareKeyStore};

#[derive(Parser)]
#[command(name = "enclavesign")]
#[command(about = "Device-bound challenge signer over a line-delimited JSON channel")]
#[command(version)]
struct Cli {
    /// Namespace tag prepended to every key's storage name
    #[arg(long, env = "ENCLAVESIGN_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Maximum number of distinct keys the store will hold
    #[arg(long, env = "ENCLAVESIGN_MAX_KEYS")]
    max_keys: Option<usize>,
}

impl Cli {
    fn config(self) -> SignerConfig {
        SignerConfig {
            namespace: self.namespace,
            max_keys: self.max_keys,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("enclavesign v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Cli::parse().config();
    let deriver = config.validate()?;

    let rng = SystemRng::new()?;
    info!("OS random source initialized");

    let store = SoftwareKeyStore::with_quota(rng, config.max_keys);
    let dispatcher = Dispatcher::new(SigningService::with_deriver(Arc::new(store), deriver));
    info!("Key namespace {}", config.namespace);

    info!("Entering request loop - one JSON call per line");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    // Split on raw bytes: a line that is not UTF-8 still gets a reply
    for line in stdin.lock().split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let response = dispatcher.handle_bytes(&line);
        match response.code() {
            None => debug!("Call succeeded"),
            Some(code) => warn!("Call failed: {}", code),
        }

        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    info!("stdin closed - shutting down");
    Ok(())
}

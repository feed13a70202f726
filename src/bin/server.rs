use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{error, info, LevelFilter};

use rokv::store::{self, build_index};
use rokv::workers::{RayonSessionPool, SessionPool};
use rokv::{read_config, spawn_config_watch, Handler, RespServer};

/// Args for rokv-server
#[derive(Parser)]
#[clap(author, version, about)]
#[clap(propagate_version = true)]
struct ServerArgs {
    /// Addr to listen on
    #[clap(long, value_parser, default_value = "localhost:6380")]
    addr: String,
    /// Config file name, with records file name and index file name
    #[clap(long = "config_file_name", value_parser, default_value = "config.json")]
    config_file_name: PathBuf,
    /// Check config file interval
    #[clap(long = "check-config-interval", value_parser = humantime::parse_duration, default_value = "5s")]
    check_config_interval: Duration,
    /// Only generate index and exit
    #[clap(long = "only_generate_index")]
    only_generate_index: bool,
    /// Records file name for index generation
    #[clap(long = "records_file_name", value_parser, default_value = "")]
    records_file_name: String,
    /// Index file name for index generation
    #[clap(long = "index_file_name", value_parser, default_value = "")]
    index_file_name: String,
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let args = ServerArgs::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        exit(1);
    }
}

fn run(args: ServerArgs) -> anyhow::Result<()> {
    if args.only_generate_index {
        return generate_index(&args.records_file_name, &args.index_file_name);
    }

    let (config, last_modified) = read_config(&args.config_file_name)
        .with_context(|| format!("reading config {}", args.config_file_name.display()))?;
    let store = store::load_store(&config).context("building store")?;
    info!(
        "serving {} keys from {}",
        store.len(),
        config.records_file_name
    );

    let handler = Arc::new(Handler::new(Arc::new(store)));
    spawn_config_watch(
        Arc::clone(&handler),
        args.config_file_name.clone(),
        args.check_config_interval,
        last_modified,
    );

    let workers = RayonSessionPool::with_workers(num_cpus::get())?;
    info!(
        "rokv-server {} listening on {}",
        env!("CARGO_PKG_VERSION"),
        args.addr
    );
    RespServer::new(handler, workers).run(args.addr.as_str())?;
    Ok(())
}

fn generate_index(records_file_name: &str, index_file_name: &str) -> anyhow::Result<()> {
    let records = File::open(records_file_name)
        .with_context(|| format!("opening records file {}", records_file_name))?;
    let index = build_index(BufReader::new(records)).context("building index")?;

    let out = File::create(index_file_name)
        .with_context(|| format!("creating index file {}", index_file_name))?;
    let mut out = BufWriter::new(out);
    index.write_jsonl(&mut out).context("writing index")?;
    out.flush()?;

    info!(
        "index for {} written to {} ({} keys)",
        records_file_name,
        index_file_name,
        index.len()
    );
    Ok(())
}

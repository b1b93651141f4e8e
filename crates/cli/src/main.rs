//! # CLI - partition split shell
//!
//! A REPL over an in-memory replicated store. It plans splits the way a query
//! engine's coordinator would, ships each one through its wire form, and reads
//! the partition back as shaped rows. Reads commands from stdin and prints
//! results to stdout; logs go to stderr so piped output stays clean.
//!
//! ## Commands
//!
//! ```text
//! PUT path value     Store value under /major/.../-/minor/... (prints partition)
//! DOWN replica-id    Make a replica unreachable (e.g. rg1-rn2)
//! UP replica-id      Bring a replica back
//! PLAN               Print one split per partition
//! SCAN partition     Plan, encode, decode and read one partition
//! SCANALL            SCAN every partition
//! STATS              Print store debug info
//! EXIT / QUIT        Leave
//! ```
//!
//! ## Configuration
//!
//! ```text
//! KVSPLIT_CONFIG      .properties file with kv.* keys  (optional)
//! KVSPLIT_STORE       store name                      (default: "kvstore")
//! KVSPLIT_MAJOR_KEYS  major column names              (default: "k1,k2")
//! KVSPLIT_MINOR_KEYS  minor column names              (default: unset -> "value")
//! KVSPLIT_PARTITIONS  partition count                 (default: 4)
//! KVSPLIT_GROUPS      replication groups              (default: 2)
//! KVSPLIT_REPLICAS    replicas per group              (default: 3)
//! RUST_LOG            log filter                      (default: "warn")
//! ```
//!
//! With `KVSPLIT_CONFIG` set, the store name, columns and iteration settings
//! come from the file; helper hosts must name demo replicas
//! (`sn1.kv.local:5000` ...).
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! kvsplit ready (store=kvstore, partitions=4, groups=2, replicas=3, columns=k1,k2,value)
//! > PUT /user/1 Ada
//! OK (partition 2)
//! > SCAN 2
//! 0 | k1=user k2=1 value=Ada
//! (1 rows, partition 2, split 329 bytes)
//! > EXIT
//! bye
//! ```

mod shell;

use anyhow::Result;
use config::{load_properties, ColumnMapping, JobConfig};
use shell::{format_row, format_split, ScanResult, Shell};
use std::io::{self, BufRead, Write};
use store::{MemStore, NodeHealth};
use tracing_subscriber::EnvFilter;

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn default_job(store: &MemStore) -> Result<JobConfig> {
    let minor = std::env::var("KVSPLIT_MINOR_KEYS").ok();
    let columns = ColumnMapping::parse(&env_or("KVSPLIT_MAJOR_KEYS", "k1,k2"), minor.as_deref())?;
    Ok(JobConfig::new(store.helper_hosts(), store.store_name(), columns))
}

fn print_scan(columns: &[String], result: &ScanResult) {
    for (row_key, row) in &result.rows {
        println!("{}", format_row(columns, *row_key, row));
    }
    println!(
        "({} rows, partition {}, split {} bytes)",
        result.rows.len(),
        result.partition,
        result.split_bytes
    );
}

fn main() -> Result<()> {
    setup_logging();

    let partitions: u32 = env_or("KVSPLIT_PARTITIONS", "4").parse().unwrap_or(4);
    let groups: u32 = env_or("KVSPLIT_GROUPS", "2").parse().unwrap_or(2);
    let replicas: u32 = env_or("KVSPLIT_REPLICAS", "3").parse().unwrap_or(3);

    let file_job = match std::env::var("KVSPLIT_CONFIG") {
        Ok(path) => Some(JobConfig::from_properties(&load_properties(path)?)?),
        Err(_) => None,
    };
    let store_name = file_job
        .as_ref()
        .map(|job| job.store_name.clone())
        .unwrap_or_else(|| env_or("KVSPLIT_STORE", "kvstore"));
    let store = MemStore::uniform(store_name, partitions, groups, replicas)?;
    let job = match file_job {
        Some(job) => job,
        None => default_job(&store)?,
    };
    let shell = Shell::new(store, job);
    let columns = shell.column_names();

    println!(
        "kvsplit ready (store={}, partitions={}, groups={}, replicas={}, columns={})",
        shell.job().store_name,
        partitions,
        groups,
        replicas,
        columns.join(",")
    );
    println!("Commands: PUT path value | DOWN id | UP id | PLAN | SCAN p | SCANALL");
    println!("          STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "PUT" => match parts.next() {
                    Some(path) => {
                        let value = parts.collect::<Vec<&str>>().join(" ");
                        if value.is_empty() {
                            println!("ERR usage: PUT path value");
                        } else {
                            match shell.put(path, &value) {
                                Ok(p) => println!("OK (partition {})", p),
                                Err(e) => println!("ERR put failed: {}", e),
                            }
                        }
                    }
                    None => println!("ERR usage: PUT path value"),
                },
                "DOWN" | "UP" => {
                    let health = if cmd.eq_ignore_ascii_case("DOWN") {
                        NodeHealth::Unreachable
                    } else {
                        NodeHealth::Up
                    };
                    match parts.next() {
                        Some(id) => match shell.set_health(id, health) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR {}", e),
                        },
                        None => println!("ERR usage: {} replica-id", cmd.to_uppercase()),
                    }
                }
                "PLAN" => match shell.plan() {
                    Ok(splits) => {
                        for split in &splits {
                            println!("{}", format_split(split));
                        }
                        println!("({} splits)", splits.len());
                    }
                    Err(e) => println!("ERR plan failed: {:#}", e),
                },
                "SCAN" => match parts.next().map(str::parse::<u32>) {
                    Some(Ok(p)) => match shell.scan(p) {
                        Ok(result) => print_scan(&columns, &result),
                        Err(e) => println!("ERR scan failed: {:#}", e),
                    },
                    _ => println!("ERR usage: SCAN partition"),
                },
                "SCANALL" => match shell.scan_all() {
                    Ok(results) => {
                        let total: usize = results.iter().map(|r| r.rows.len()).sum();
                        for result in &results {
                            print_scan(&columns, result);
                        }
                        println!("({} rows total)", total);
                    }
                    Err(e) => println!("ERR scan failed: {:#}", e),
                },
                "STATS" => {
                    println!("{:?}", shell.store());
                    println!("job: {:?}", shell.job().iteration);
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}

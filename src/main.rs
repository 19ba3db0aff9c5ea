use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use keygate::config::GateConfig;
use keygate::gate::Allowlist;
use keygate::identity::PublicKeyHex;

const USAGE: &str = "usage: keygate <normalize KEY | check KEY | config>";

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = GateConfig::from_env();
    info!(target: "keygate", device = ?cfg.device_class, allowlist_enabled = cfg.allowlist_enabled, "keygate starting");

    match args.iter().map(|s| s.as_str()).collect::<Vec<_>>().as_slice() {
        ["normalize", key] => {
            let pk = PublicKeyHex::parse(key)?;
            println!("hex  {}", pk);
            println!("npub {}", pk.to_npub());
        }
        ["check", key] => {
            let list = Allowlist::from_config(&cfg);
            let allowed = list.is_whitelisted(key);
            println!("{}", if allowed { "allowed" } else { "denied" });
            if !allowed { std::process::exit(1); }
        }
        ["config"] => println!("{}", serde_json::to_string_pretty(&cfg)?),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
    Ok(())
}

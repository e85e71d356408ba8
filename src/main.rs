use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cfg = chroma_overlay::config::Config::parse();
    if cfg.list_devices {
        println!("Input devices:");
        for name in chroma_overlay::audio::input_device_names()? {
            println!("  - {name}");
        }
        return Ok(());
    }

    chroma_overlay::app::run(cfg)
}

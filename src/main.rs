mod app;
mod catalog;
mod config;
mod resolve;
mod scan;
mod toggle;
mod ui;
mod update;
mod viewer;

use anyhow::Result;
use std::path::PathBuf;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut root_override: Option<PathBuf> = None;
    let mut headless_scan = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" | "-r" => {
                if let Some(path) = args.next() {
                    root_override = Some(PathBuf::from(path));
                } else {
                    eprintln!("--root requires a path");
                }
            }
            "--scan" | "-s" => headless_scan = true,
            "--help" | "-h" => {
                println!("SpineSmith");
                println!("  --root <path>   Use this mods folder instead of the saved one");
                println!("  --scan          Print the mod listing without the TUI");
                return Ok(());
            }
            _ => {}
        }
    }

    if headless_scan {
        let app = app::App::initialize(root_override, app::StartupMode::Headless)?;
        for line in app.listing_lines() {
            println!("{line}");
        }
        return Ok(());
    }

    let mut app = app::App::initialize(root_override, app::StartupMode::Ui)?;
    ui::run(&mut app)
}

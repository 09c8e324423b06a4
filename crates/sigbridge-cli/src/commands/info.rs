//! `sigbridge info`: display build and environment info.

use sigbridge_engine::LOGGING_RULES_ENV;

pub fn execute() -> anyhow::Result<()> {
    println!("sigbridge v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Platform:     {} ({})", std::env::consts::OS, std::env::consts::ARCH);

    println!();
    println!("Environment:");
    print_env(LOGGING_RULES_ENV);
    print_env("NO_COLOR");

    Ok(())
}

fn print_env(name: &str) {
    match std::env::var(name) {
        Ok(val) => println!("  {:<24} {}", name, val),
        Err(_) => println!("  {:<24} (not set)", name),
    }
}

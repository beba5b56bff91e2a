use profsearch::CliError;

fn is_robot_mode_args() -> bool {
    std::env::args().any(|arg| arg == "--json" || arg == "--robot")
}

fn report(err: &CliError) -> ! {
    if is_robot_mode_args() {
        eprintln!("{}", err.to_json());
    } else {
        eprintln!("{err}");
    }
    std::process::exit(err.code);
}

fn main() {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let raw_args: Vec<String> = std::env::args().collect();
    let parsed = match profsearch::parse_cli(raw_args) {
        Ok(parsed) => parsed,
        Err(err) => report(&err),
    };

    if let Err(err) = profsearch::run_with_parsed(parsed) {
        report(&err);
    }
}

fn main() {
    if let Err(err) = elli_charging_api::app::run() {
        eprintln!("api startup failed: {err}");
        std::process::exit(1);
    }
}

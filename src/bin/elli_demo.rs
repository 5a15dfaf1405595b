use elli_charging_api::app::config::{AppConfig, DemoCredentials};
use elli_charging_api::app::{DEMO_DEFAULT_DIRECTIVE, init_logging};
use elli_charging_api::domain::models::partition_sessions;
use elli_charging_api::{ChargingSession, ElliClient, Station};

const RULE: &str = "============================================================";

fn main() {
    let dotenv = dotenvy::dotenv();
    if let Err(err) = init_logging(DEMO_DEFAULT_DIRECTIVE) {
        eprintln!("{err}");
    }
    if let Err(err) = dotenv
        && !err.not_found()
    {
        println!("Error: could not read .env file: {err}");
        std::process::exit(1);
    }

    let credentials = match DemoCredentials::from_env() {
        Ok(credentials) => credentials,
        Err(err) => {
            println!("Error: {err}");
            println!("Please copy .env.example to .env and fill in your credentials");
            std::process::exit(1);
        }
    };
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("Error: {err}");
            std::process::exit(1);
        }
    };

    println!("{RULE}");
    println!("Elli Charging API Test Client");
    println!("{RULE}");
    println!();

    let completed = actix_web::rt::System::new().block_on(run_demo(&config, &credentials));

    if completed {
        println!();
        println!("{RULE}");
        println!("Test completed!");
        println!("{RULE}");
    } else {
        std::process::exit(1);
    }
}

async fn run_demo(config: &AppConfig, credentials: &DemoCredentials) -> bool {
    // Dropped at the end of this scope, which closes the connection pool.
    let mut client = match ElliClient::new(&config.client_config()) {
        Ok(client) => client,
        Err(err) => {
            println!("[ERROR] Could not create client: {err}");
            return false;
        }
    };

    println!("[1/4] Logging in...");
    match client.login(&credentials.email, &credentials.password).await {
        Ok(token) => {
            println!("[OK] Login successful!");
            println!("  - Token type: {}", token.token_type);
            println!("  - Expires in: {} seconds", token.expires_in);
            println!("  - Access token: {}...", preview(&token.access_token, 50));
            println!();
        }
        Err(err) => {
            println!("[ERROR] Login failed: {err}");
            return false;
        }
    }

    println!("[2/4] Fetching charging stations...");
    let stations = match client.get_stations().await {
        Ok(stations) => stations,
        Err(err) => {
            println!("[ERROR] Failed to get stations: {err}");
            return false;
        }
    };
    print_stations(&stations);

    println!("[3/4] Fetching charging sessions...");
    match client.get_charging_sessions(true).await {
        Ok(sessions) => print_sessions(sessions),
        Err(err) => {
            println!("[ERROR] Failed to get charging sessions: {err}");
            return false;
        }
    }

    if stations.is_empty() {
        return true;
    }

    println!("[4/4] Fetching accumulated charging data...");
    for station in &stations {
        match client.get_accumulated_charging(&station.id).await {
            Ok(accumulated) => {
                println!("\n  Station: {}", station.name);
                match accumulated.accumulated_energy_wh() {
                    Some(energy_wh) => {
                        println!("    - Total Energy: {:.2} kWh", energy_wh / 1000.0);
                        if let Some(watts) = accumulated
                            .momentary_charging_speed_watts()
                            .filter(|watts| *watts > 0.0)
                        {
                            println!("    - Current Power: {:.2} kW", watts / 1000.0);
                        }
                        if let Some(started) = accumulated.start_date_time() {
                            println!("    - Session Start: {started}");
                        }
                    }
                    None => println!("    - No active charging session"),
                }
            }
            Err(err) => {
                println!("[ERROR] Failed to get accumulated charging: {err}");
                break;
            }
        }
    }

    true
}

fn print_stations(stations: &[Station]) {
    println!("[OK] Found {} station(s)", stations.len());
    for (index, station) in stations.iter().enumerate() {
        println!("\n  Station {}:", index + 1);
        println!("    - Name: {}", station.name);
        println!("    - ID: {}", station.id);
        println!("    - Model: {}", station.model);
        println!("    - Serial: {}", station.serial_number);
        println!("    - Firmware: {}", station.firmware_version);
    }
    println!();
}

fn print_sessions(sessions: Vec<ChargingSession>) {
    println!("[OK] Found {} charging session(s)", sessions.len());

    let (active, completed) = partition_sessions(sessions);
    println!("  - Active: {}", active.len());
    println!("  - Completed: {}", completed.len());

    if !active.is_empty() {
        println!("\n  Active Sessions:");
        for session in &active {
            println!("\n    Session ID: {}", session.id);
            println!("    - Station ID: {}", session.station_id);
            println!("    - Started: {}", session.start_date_time.to_rfc3339());
            if let Some(energy_wh) = session.accumulated_energy_wh {
                println!("    - Energy: {:.2} kWh", energy_wh / 1000.0);
            }
            if let Some(watts) = session
                .momentary_charging_speed_watts
                .filter(|watts| *watts > 0.0)
            {
                println!("    - Current Power: {:.2} kW", watts / 1000.0);
            }
            if let Some(status) = &session.status {
                println!("    - Status: {status}");
            }
        }
    }
    println!();
}

fn preview(token: &str, max_chars: usize) -> String {
    token.chars().take(max_chars).collect()
}

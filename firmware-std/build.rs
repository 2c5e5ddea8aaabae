fn main() {
    embuild::espidf::sysenv::output();
    load_env_config();
}

/// Compile the network credentials and report URL into the firmware.
/// Environment variables take priority over `.env` file values.
fn load_env_config() {
    use std::env;
    use std::path::Path;

    const KEYS: [&str; 5] = ["WIFI_SSID", "WIFI_PASSWORD", "AP_SSID", "AP_PASSWORD", "REPORT_URL"];

    println!("cargo:rerun-if-changed=.env");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {e}"),
        }
    }

    for key in KEYS {
        let value = env::var(key).unwrap_or_default().trim().to_string();
        println!("cargo:rustc-env={key}={value}");
    }

    if env::var("WIFI_SSID").map(|s| s.trim().is_empty()).unwrap_or(true) {
        println!("cargo:warning=WIFI_SSID is empty - the station join will never succeed");
    }
}
